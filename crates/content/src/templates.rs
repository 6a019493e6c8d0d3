//! Static short-form template catalog and `{{variable}}` rendering.
//!
//! Rendering is plain substitution: every `{{key}}` with a supplied value
//! is replaced, and unresolved placeholders are left verbatim so a missing
//! variable is visible in the output instead of failing the render.

use invite_core::types::Channel;
use invite_core::{InviteError, InviteResult};
use serde::Serialize;
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct MessageTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub channel: Channel,
    pub body: &'static str,
    /// Placeholder names the template expects.
    pub variables: &'static [&'static str],
}

const TEMPLATES: &[MessageTemplate] = &[
    MessageTemplate {
        id: "sms-event-invite",
        name: "Event Invitation",
        channel: Channel::Sms,
        body: "Dear {{name}}, you are invited to {{event}} on {{date}} at {{venue}}. \
               - {{committee}}",
        variables: &["name", "event", "date", "venue", "committee"],
    },
    MessageTemplate {
        id: "sms-event-reminder",
        name: "Event Reminder",
        channel: Channel::Sms,
        body: "Reminder: {{event}} is tomorrow ({{date}}) at {{venue}}. See you there! \
               - {{committee}}",
        variables: &["event", "date", "venue", "committee"],
    },
    MessageTemplate {
        id: "sms-thank-you",
        name: "Thank You",
        channel: Channel::Sms,
        body: "Dear {{name}}, thank you for attending {{event}}. - {{committee}}",
        variables: &["name", "event", "committee"],
    },
    MessageTemplate {
        id: "wa-event-invite",
        name: "Event Invitation",
        channel: Channel::WhatsApp,
        body: "\u{1F393} Dear {{name}},\n\nThe {{committee}} invites you to *{{event}}*!\n\n\
               \u{1F4C5} {{date}}\n\u{1F4CD} {{venue}}\n\nWe look forward to your presence.",
        variables: &["name", "committee", "event", "date", "venue"],
    },
    MessageTemplate {
        id: "wa-event-reminder",
        name: "Event Reminder",
        channel: Channel::WhatsApp,
        body: "\u{23F0} Reminder, {{name}}!\n\n*{{event}}* is happening on {{date}} at \
               {{venue}}.\n\nSee you there \u{2014} {{committee}}",
        variables: &["name", "event", "date", "venue", "committee"],
    },
    MessageTemplate {
        id: "wa-rsvp-request",
        name: "RSVP Request",
        channel: Channel::WhatsApp,
        body: "Dear {{name}}, please confirm your attendance for *{{event}}* ({{date}}) \
               by replying YES or NO. \u{1F64F}",
        variables: &["name", "event", "date"],
    },
];

/// Templates available for a channel.
pub fn list_templates(channel: Channel) -> Vec<&'static MessageTemplate> {
    TEMPLATES.iter().filter(|t| t.channel == channel).collect()
}

/// Render a catalog template by id.
pub fn render_template(id: &str, vars: &HashMap<String, String>) -> InviteResult<String> {
    let template = TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| InviteError::NotFound(format!("template {id}")))?;
    Ok(render(template.body, vars))
}

/// Plain `{{key}}` substitution; unresolved placeholders stay verbatim.
pub fn render(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let placeholder = format!("{{{{{key}}}}}");
        result = result.replace(&placeholder, value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_known_keys() {
        let out = render(
            "Hi {{name}}, welcome to {{event}}",
            &vars(&[("name", "Ana"), ("event", "TechFest")]),
        );
        assert_eq!(out, "Hi Ana, welcome to TechFest");
    }

    #[test]
    fn test_render_leaves_unresolved_verbatim() {
        let out = render("Hi {{name}}, see you at {{venue}}", &vars(&[("name", "Ana")]));
        assert_eq!(out, "Hi Ana, see you at {{venue}}");
    }

    #[test]
    fn test_list_templates_by_channel() {
        let sms = list_templates(Channel::Sms);
        assert_eq!(sms.len(), 3);
        assert!(sms.iter().all(|t| t.channel == Channel::Sms));

        let wa = list_templates(Channel::WhatsApp);
        assert_eq!(wa.len(), 3);
    }

    #[test]
    fn test_render_template_by_id() {
        let out = render_template(
            "sms-thank-you",
            &vars(&[("name", "Ana"), ("event", "TechFest"), ("committee", "CS Dept")]),
        )
        .unwrap();
        assert_eq!(out, "Dear Ana, thank you for attending TechFest. - CS Dept");
    }

    #[test]
    fn test_render_template_unknown_id() {
        let err = render_template("sms-missing", &HashMap::new()).unwrap_err();
        assert!(matches!(err, InviteError::NotFound(_)));
    }
}

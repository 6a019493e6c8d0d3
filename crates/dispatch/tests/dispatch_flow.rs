//! End-to-end dispatch flows: resolve, send, log, webhook events, retry,
//! and the recipient delete guard.

use invite_channels::email::{EmailProvider, EmailTransport, SendPath};
use invite_channels::sms::{SmsGateway, StubSmsTransport};
use invite_channels::whatsapp::WhatsAppLinker;
use invite_core::config::{EmailConfig, SmsConfig, WhatsAppConfig};
use invite_core::types::{
    Channel, DeliveryEventType, DeliveryStatus, RecipientProfile, WebhookEvent,
};
use invite_core::InviteError;
use invite_dispatch::{CampaignDispatcher, CampaignStore, DispatchRequest, EventOutcome};
use invite_directory::{DirectoryStore, RecipientDraft, RecipientSelection};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Email transport that rejects addresses in a shared fail set.
struct SelectiveTransport {
    failing: Arc<Mutex<HashSet<String>>>,
}

impl EmailTransport for SelectiveTransport {
    fn submit(&self, payload: &serde_json::Value) -> Result<String, String> {
        let to = payload["personalizations"][0]["to"][0]["email"]
            .as_str()
            .unwrap_or_default();
        if self.failing.lock().unwrap().contains(to) {
            Err(format!("550 rejected: {to}"))
        } else {
            Ok(format!("msg-{}", Uuid::new_v4()))
        }
    }
}

fn email_config() -> EmailConfig {
    EmailConfig {
        api_key: "sg_test_key".to_string(),
        ..EmailConfig::default()
    }
}

fn sms_config() -> SmsConfig {
    SmsConfig {
        api_key: "gw_test_key".to_string(),
        device_id: "device-7".to_string(),
        send_delay_ms: 0,
        ..SmsConfig::default()
    }
}

fn dispatcher_with_failing(
    failing: Arc<Mutex<HashSet<String>>>,
) -> (CampaignDispatcher, Arc<DirectoryStore>, Arc<CampaignStore>) {
    let directory = Arc::new(DirectoryStore::new());
    let store = Arc::new(CampaignStore::new());
    let email = EmailProvider::new(email_config(), Box::new(SelectiveTransport { failing }));
    let sms = SmsGateway::new(sms_config(), Box::new(StubSmsTransport));
    let whatsapp = WhatsAppLinker::new(WhatsAppConfig::default());
    let dispatcher = CampaignDispatcher::new(
        directory.clone(),
        store.clone(),
        email,
        sms,
        whatsapp,
    );
    (dispatcher, directory, store)
}

fn dispatcher() -> (CampaignDispatcher, Arc<DirectoryStore>, Arc<CampaignStore>) {
    dispatcher_with_failing(Arc::new(Mutex::new(HashSet::new())))
}

fn student(directory: &DirectoryStore, name: &str, email: &str, phone: Option<&str>) -> Uuid {
    directory
        .create(RecipientDraft {
            name: name.to_string(),
            email: email.to_string(),
            phone: phone.map(|p| p.to_string()),
            profile: RecipientProfile::Student {
                course: "CS".to_string(),
                year: "2nd Year".to_string(),
            },
        })
        .unwrap()
        .id
}

fn email_request(selection: RecipientSelection) -> DispatchRequest {
    DispatchRequest {
        channel: Channel::Email,
        selection,
        title: "TechFest invites".to_string(),
        subject: "Invitation: TechFest | CS Department".to_string(),
        content: "Hi {{name}}, you are invited.".to_string(),
        email_path: SendPath::Standard,
    }
}

fn selection_of(student_ids: Vec<Uuid>) -> RecipientSelection {
    RecipientSelection {
        student_ids,
        guest_ids: vec![],
        professor_ids: vec![],
    }
}

#[tokio::test]
async fn email_dispatch_personalizes_and_logs() {
    let (dispatcher, directory, store) = dispatcher();
    let ana = student(&directory, "Ana", "ana@x.edu", None);

    let result = dispatcher
        .dispatch(email_request(selection_of(vec![ana])))
        .await
        .unwrap();

    assert_eq!(result.attempted, 1);
    assert_eq!(result.sent, 1);
    assert_eq!(result.failed, 0);

    let campaign = store.get_campaign(result.campaign_id).unwrap();
    assert_eq!(campaign.recipient_total, 1);
    assert_eq!(campaign.channel, Channel::Email);

    let entries = store.entries_for_campaign(result.campaign_id);
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].content, "Hi Ana, you are invited.");
    assert_eq!(entries[0].status, DeliveryStatus::Sent);
    assert!(entries[0].provider_message_id.is_some());
}

#[tokio::test]
async fn partial_failure_counts_both_sides() {
    let failing = Arc::new(Mutex::new(HashSet::from(["bo@x.edu".to_string()])));
    let (dispatcher, directory, store) = dispatcher_with_failing(failing);

    let ana = student(&directory, "Ana", "ana@x.edu", None);
    let bo = student(&directory, "Bo", "bo@x.edu", None);
    let cleo = student(&directory, "Cleo", "cleo@x.edu", None);

    let result = dispatcher
        .dispatch(email_request(selection_of(vec![ana, bo, cleo])))
        .await
        .unwrap();

    assert_eq!(result.attempted, 3);
    assert_eq!(result.sent, 2);
    assert_eq!(result.failed, 1);
    assert_eq!(result.failures.len(), 1);
    assert_eq!(result.failures[0].contact, "bo@x.edu");
    assert!(result.failures[0].reason.contains("550"));

    let entries = store.entries_for_campaign(result.campaign_id);
    assert_eq!(entries.len(), 3);
    let failed: Vec<_> = entries
        .iter()
        .filter(|e| e.status == DeliveryStatus::Failed)
        .collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].contact, "bo@x.edu");
    assert!(failed[0].error.is_some());
}

#[tokio::test]
async fn empty_selection_rejected_before_campaign_creation() {
    let (dispatcher, _directory, store) = dispatcher();
    let err = dispatcher
        .dispatch(email_request(RecipientSelection::default()))
        .await
        .unwrap_err();
    assert!(matches!(err, InviteError::NoRecipients));
    assert!(store.list_campaigns().is_empty());
}

#[tokio::test]
async fn unresolvable_ids_dropped_silently() {
    let (dispatcher, directory, store) = dispatcher();
    let ana = student(&directory, "Ana", "ana@x.edu", None);

    // One real id plus two unknown ones: only the real one is attempted.
    let result = dispatcher
        .dispatch(email_request(selection_of(vec![
            ana,
            Uuid::new_v4(),
            Uuid::new_v4(),
        ])))
        .await
        .unwrap();
    assert_eq!(result.attempted, 1);
    assert_eq!(result.sent, 1);

    // All unknown: nothing to send, no campaign row left behind.
    store.delete_campaign(result.campaign_id).unwrap();
    let err = dispatcher
        .dispatch(email_request(selection_of(vec![Uuid::new_v4()])))
        .await
        .unwrap_err();
    assert!(matches!(err, InviteError::NoRecipients));
    assert!(store.list_campaigns().is_empty());
}

#[tokio::test]
async fn missing_email_credentials_fail_fast() {
    let directory = Arc::new(DirectoryStore::new());
    let store = Arc::new(CampaignStore::new());
    let email = EmailProvider::new(
        EmailConfig::default(),
        Box::new(SelectiveTransport {
            failing: Arc::new(Mutex::new(HashSet::new())),
        }),
    );
    let sms = SmsGateway::new(sms_config(), Box::new(StubSmsTransport));
    let whatsapp = WhatsAppLinker::new(WhatsAppConfig::default());
    let dispatcher =
        CampaignDispatcher::new(directory.clone(), store.clone(), email, sms, whatsapp);

    let ana = student(&directory, "Ana", "ana@x.edu", None);
    let err = dispatcher
        .dispatch(email_request(selection_of(vec![ana])))
        .await
        .unwrap_err();
    assert!(matches!(err, InviteError::Config(_)));
    assert!(store.list_campaigns().is_empty());
}

#[tokio::test]
async fn sms_requires_phone_and_honors_ceiling() {
    let (dispatcher, directory, store) = dispatcher();
    let with_phone = student(&directory, "Ana", "ana@x.edu", Some("+15551230001"));
    let without_phone = student(&directory, "Bo", "bo@x.edu", None);

    let result = dispatcher
        .dispatch(DispatchRequest {
            channel: Channel::Sms,
            selection: selection_of(vec![with_phone, without_phone]),
            title: "Reminder".to_string(),
            subject: String::new(),
            content: "Hi {{name}}, see you tomorrow.".to_string(),
            email_path: SendPath::Standard,
        })
        .await
        .unwrap();

    assert_eq!(result.sent, 1);
    assert_eq!(result.failed, 1);
    assert!(result.failures[0].reason.contains("phone"));

    let entries = store.entries_for_campaign(result.campaign_id);
    let sent: Vec<_> = entries
        .iter()
        .filter(|e| e.status == DeliveryStatus::Sent)
        .collect();
    assert_eq!(sent[0].contact, "+15551230001");

    // Ceiling: more resolved recipients than the gateway plan allows.
    let many: Vec<Uuid> = (0..101)
        .map(|i| {
            student(
                &directory,
                &format!("S{i}"),
                &format!("s{i}@x.edu"),
                Some("+15551239999"),
            )
        })
        .collect();
    let err = dispatcher
        .dispatch(DispatchRequest {
            channel: Channel::Sms,
            selection: selection_of(many),
            title: "Reminder".to_string(),
            subject: String::new(),
            content: "hello".to_string(),
            email_path: SendPath::Standard,
        })
        .await
        .unwrap_err();
    assert!(matches!(err, InviteError::Validation(_)));
}

#[tokio::test]
async fn whatsapp_dispatch_generates_links() {
    let (dispatcher, directory, store) = dispatcher();
    let ana = student(&directory, "Ana", "ana@x.edu", Some("+15551230001"));

    let result = dispatcher
        .dispatch(DispatchRequest {
            channel: Channel::WhatsApp,
            selection: selection_of(vec![ana]),
            title: "WA invites".to_string(),
            subject: String::new(),
            content: "Hi {{name}}!".to_string(),
            email_path: SendPath::Standard,
        })
        .await
        .unwrap();

    assert_eq!(result.sent, 1);
    assert_eq!(result.links.len(), 1);
    assert!(result.links[0].link.starts_with("whatsapp://send?to=+15551230001"));

    let entries = store.entries_for_campaign(result.campaign_id);
    assert_eq!(entries[0].status, DeliveryStatus::Generated);
    assert!(entries[0].provider_message_id.is_none());
}

#[tokio::test]
async fn combo_dispatch_creates_one_campaign_per_channel() {
    let (dispatcher, directory, store) = dispatcher();
    let ana = student(&directory, "Ana", "ana@x.edu", Some("+15551230001"));

    let outcomes = dispatcher
        .dispatch_combo(
            &[Channel::Email, Channel::Sms],
            selection_of(vec![ana]),
            "TechFest",
            "Invitation: TechFest",
            "Hi {{name}}",
            SendPath::Standard,
        )
        .await;

    assert_eq!(outcomes.len(), 2);
    for (_, outcome) in &outcomes {
        assert_eq!(outcome.as_ref().unwrap().sent, 1);
    }
    assert_eq!(store.list_campaigns().len(), 2);
    let channels: HashSet<Channel> = store.list_campaigns().iter().map(|c| c.channel).collect();
    assert!(channels.contains(&Channel::Email));
    assert!(channels.contains(&Channel::Sms));
}

#[tokio::test]
async fn webhook_events_drive_analytics() {
    let (dispatcher, directory, store) = dispatcher();
    let ana = student(&directory, "Ana", "ana@x.edu", None);
    let bo = student(&directory, "Bo", "bo@x.edu", None);

    let result = dispatcher
        .dispatch(email_request(selection_of(vec![ana, bo])))
        .await
        .unwrap();

    let entries = store.entries_for_campaign(result.campaign_id);
    let pid = entries[0].provider_message_id.clone().unwrap();

    for event in [
        DeliveryEventType::Delivered,
        DeliveryEventType::Opened,
        DeliveryEventType::OpenedUnique,
    ] {
        let outcome = store.apply_event(&WebhookEvent {
            message_id: pid.clone(),
            event,
            email: Some(entries[0].contact.clone()),
            timestamp: None,
            reason: None,
        });
        assert_ne!(outcome, EventOutcome::UnknownMessage);
    }

    let summary = store.summarize(Some(result.campaign_id));
    assert_eq!(summary.total_sent, 2);
    assert_eq!(summary.delivered, 1);
    assert_eq!(summary.opened, 1);
    assert_eq!(summary.pending, 1);
    assert_eq!(summary.unique_opens, 1);
    assert_eq!(summary.delivery_rate, 50.0);

    // Global email analytics see the same rows.
    let global = store.summarize(None);
    assert_eq!(global.total_sent, 2);
}

#[tokio::test]
async fn retry_flips_failed_rows_in_place() {
    let failing = Arc::new(Mutex::new(HashSet::from(["bo@x.edu".to_string()])));
    let (dispatcher, directory, store) = dispatcher_with_failing(failing.clone());

    let ana = student(&directory, "Ana", "ana@x.edu", None);
    let bo = student(&directory, "Bo", "bo@x.edu", None);
    let result = dispatcher
        .dispatch(email_request(selection_of(vec![ana, bo])))
        .await
        .unwrap();
    assert_eq!(result.failed, 1);

    // Provider recovers for Bo; retry resubmits only the failed row.
    failing.lock().unwrap().clear();
    let report = dispatcher.retry_failed(result.campaign_id).await.unwrap();
    assert_eq!(report.attempted, 1);
    assert_eq!(report.retried, 1);
    assert_eq!(report.still_failed, 0);

    let entries = store.entries_for_campaign(result.campaign_id);
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == DeliveryStatus::Sent));
    assert!(entries.iter().all(|e| e.error.is_none()));

    // Second retry is a no-op.
    let report = dispatcher.retry_failed(result.campaign_id).await.unwrap();
    assert_eq!(report.attempted, 0);
}

#[tokio::test]
async fn retry_resubmits_with_personalized_subject() {
    // Transport that records every submitted subject and fails addresses
    // in the shared fail set.
    struct SubjectRecorder {
        failing: Arc<Mutex<HashSet<String>>>,
        subjects: Arc<Mutex<Vec<String>>>,
    }

    impl EmailTransport for SubjectRecorder {
        fn submit(&self, payload: &serde_json::Value) -> Result<String, String> {
            let subject = payload["subject"].as_str().unwrap_or_default();
            self.subjects.lock().unwrap().push(subject.to_string());
            let to = payload["personalizations"][0]["to"][0]["email"]
                .as_str()
                .unwrap_or_default();
            if self.failing.lock().unwrap().contains(to) {
                Err(format!("550 rejected: {to}"))
            } else {
                Ok(format!("msg-{}", Uuid::new_v4()))
            }
        }
    }

    let failing = Arc::new(Mutex::new(HashSet::from(["ana@x.edu".to_string()])));
    let subjects = Arc::new(Mutex::new(Vec::new()));
    let directory = Arc::new(DirectoryStore::new());
    let store = Arc::new(CampaignStore::new());
    let email = EmailProvider::new(
        email_config(),
        Box::new(SubjectRecorder {
            failing: failing.clone(),
            subjects: subjects.clone(),
        }),
    );
    let sms = SmsGateway::new(sms_config(), Box::new(StubSmsTransport));
    let whatsapp = WhatsAppLinker::new(WhatsAppConfig::default());
    let dispatcher =
        CampaignDispatcher::new(directory.clone(), store.clone(), email, sms, whatsapp);

    let ana = student(&directory, "Ana", "ana@x.edu", None);
    let result = dispatcher
        .dispatch(DispatchRequest {
            channel: Channel::Email,
            selection: selection_of(vec![ana]),
            title: "TechFest invites".to_string(),
            subject: "Hello {{name}}".to_string(),
            content: "Hi {{name}}, you are invited.".to_string(),
            email_path: SendPath::Standard,
        })
        .await
        .unwrap();
    assert_eq!(result.failed, 1);

    failing.lock().unwrap().clear();
    let report = dispatcher.retry_failed(result.campaign_id).await.unwrap();
    assert_eq!(report.retried, 1);

    // Both the original submission and the retry carry the rendered
    // subject, never the raw placeholder.
    let subjects = subjects.lock().unwrap();
    assert_eq!(*subjects, vec!["Hello Ana", "Hello Ana"]);
}

#[tokio::test]
async fn retry_unknown_campaign_is_not_found() {
    let (dispatcher, _, _) = dispatcher();
    let err = dispatcher.retry_failed(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, InviteError::NotFound(_)));
}

#[tokio::test]
async fn delete_recipient_guarded_by_history() {
    let (dispatcher, directory, store) = dispatcher();
    let ana = student(&directory, "Ana", "ana@x.edu", None);

    let result = dispatcher
        .dispatch(email_request(selection_of(vec![ana])))
        .await
        .unwrap();

    let err = dispatcher
        .delete_recipient(invite_core::types::RecipientKind::Student, ana)
        .unwrap_err();
    assert!(matches!(err, InviteError::Conflict(_)));
    assert!(directory.get(ana).is_some());

    // Deleting the campaign clears the history; the delete then succeeds.
    store.delete_campaign(result.campaign_id).unwrap();
    assert!(dispatcher
        .delete_recipient(invite_core::types::RecipientKind::Student, ana)
        .is_ok());
    assert!(directory.get(ana).is_none());
}

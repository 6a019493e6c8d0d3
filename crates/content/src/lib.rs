//! Template and content production: model-assisted invitation generation
//! with a deterministic fallback, plus the static short-form template
//! catalog for SMS and WhatsApp.

pub mod generator;
pub mod templates;

pub use generator::{ApiTextModel, EventParams, GeneratedInvite, InviteGenerator, TextModel};
pub use templates::{list_templates, render, render_template, MessageTemplate};

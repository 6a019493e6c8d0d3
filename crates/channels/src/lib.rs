//! Channel providers: email submission with two send paths, SMS gateway
//! dispatch, WhatsApp deep-link construction, and webhook signature
//! verification.

pub mod email;
pub mod scrub;
pub mod signature;
pub mod sms;
pub mod whatsapp;

pub use email::{EmailProvider, EmailTransport, SendPath, StubEmailTransport};
pub use signature::{generate_signature, verify_header};
pub use sms::{SmsGateway, SmsTransport, StubSmsTransport};
pub use whatsapp::WhatsAppLinker;

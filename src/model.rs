use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Webhook endpoint for the clue-list signup form.
pub const SIGNUP_ENDPOINT: &str =
    "https://n8n-latest-fsq5.onrender.com/webhook/chasse-tresor-inscription";
/// Webhook endpoint for winner claims (both the open and the QR-gated flow).
pub const CLAIM_ENDPOINT: &str =
    "https://n8n-latest-fsq5.onrender.com/webhook/chasse-tresor-gagnant";

pub const SIGNUP_SOURCE: &str = "Landing Page Chasse 2026";
pub const CLAIM_SOURCE: &str = "QR CODE TICKET OR";

/// Submission workflow status. Exactly one is active at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    /// Initial scan-validation phase, shown before the form is revealed.
    Validating,
    Idle,
    Sending,
    Success,
    Error,
}

impl WorkflowStatus {
    /// `Success` is the only terminal status; the form is hidden for good.
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Success)
    }

    /// A submit attempt is accepted only from `Idle` or `Error`.
    pub fn can_submit(self) -> bool {
        matches!(self, WorkflowStatus::Idle | WorkflowStatus::Error)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Validating => "validating",
            WorkflowStatus::Idle => "idle",
            WorkflowStatus::Sending => "sending",
            WorkflowStatus::Success => "success",
            WorkflowStatus::Error => "error",
        }
    }
}

/// Which contest flow this run drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Variant {
    /// Email signup for clue notifications.
    Signup,
    /// Winner claim with identity fields.
    Claim,
    /// Winner claim reached through the QR deep link; token-gated.
    GatedClaim,
}

impl Variant {
    pub fn endpoint(self) -> &'static str {
        match self {
            Variant::Signup => SIGNUP_ENDPOINT,
            Variant::Claim | Variant::GatedClaim => CLAIM_ENDPOINT,
        }
    }

    pub fn source(self) -> &'static str {
        match self {
            Variant::Signup => SIGNUP_SOURCE,
            Variant::Claim | Variant::GatedClaim => CLAIM_SOURCE,
        }
    }

    /// Only the QR flow checks the token before sending.
    pub fn gated(self) -> bool {
        matches!(self, Variant::GatedClaim)
    }

    pub fn required_fields(self) -> &'static [Field] {
        match self {
            Variant::Signup => &[Field::Email],
            Variant::Claim => &[Field::Prenom, Field::Nom],
            Variant::GatedClaim => &[Field::Prenom, Field::Nom, Field::Email],
        }
    }

    /// The claim pages play a scan-validation animation before revealing the
    /// form; the landing page reveals immediately.
    pub fn default_reveal_delay(self) -> Duration {
        match self {
            Variant::Signup => Duration::ZERO,
            Variant::Claim | Variant::GatedClaim => Duration::from_millis(2500),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Variant::Signup => "Connexion au Réseau",
            Variant::Claim | Variant::GatedClaim => "Ticket d'Or",
        }
    }
}

/// A named form field. Wire names are the French labels the webhook expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Prenom,
    Nom,
    Email,
}

impl Field {
    pub fn label(self) -> &'static str {
        match self {
            Field::Prenom => "Prénom",
            Field::Nom => "Nom",
            Field::Email => "Email",
        }
    }

    pub fn placeholder(self) -> &'static str {
        match self {
            Field::Prenom => "Michaël",
            Field::Nom => "Kaeser",
            Field::Email => "agent@neocard.ch",
        }
    }
}

/// Mutable, user-controlled field values. The workflow core stores them
/// verbatim; required-field enforcement belongs to the rendering layers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryForm {
    pub prenom: String,
    pub nom: String,
    pub email: String,
}

impl EntryForm {
    pub fn get(&self, field: Field) -> &str {
        match field {
            Field::Prenom => &self.prenom,
            Field::Nom => &self.nom,
            Field::Email => &self.email,
        }
    }

    pub fn set(&mut self, field: Field, value: String) {
        match field {
            Field::Prenom => self.prenom = value,
            Field::Nom => self.nom = value,
            Field::Email => self.email = value,
        }
    }

    /// True when every field the variant requires is non-empty.
    pub fn is_complete(&self, variant: Variant) -> bool {
        variant
            .required_fields()
            .iter()
            .all(|f| !self.get(*f).trim().is_empty())
    }
}

/// Immutable snapshot sent to the webhook. Assembled once per submit attempt;
/// a retry after an error produces a fresh snapshot with a new timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prenom: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    pub source: String,
    pub timestamp: String,
    #[serde(rename = "deviceInfo", skip_serializing_if = "Option::is_none")]
    pub device_info: Option<String>,
}

impl SubmissionPayload {
    /// Assemble the body for the configured variant from the current form.
    pub fn assemble(cfg: &WorkflowConfig, form: &EntryForm, timestamp: String) -> Self {
        match cfg.variant {
            Variant::Signup => Self {
                nom: None,
                prenom: None,
                email: Some(form.email.clone()),
                token: None,
                source: cfg.source.clone(),
                timestamp,
                device_info: None,
            },
            Variant::Claim => Self {
                nom: Some(form.nom.clone()),
                prenom: Some(form.prenom.clone()),
                email: None,
                token: None,
                source: cfg.source.clone(),
                timestamp,
                device_info: Some(cfg.device_info.clone()),
            },
            Variant::GatedClaim => Self {
                nom: Some(form.nom.clone()),
                prenom: Some(form.prenom.clone()),
                email: Some(form.email.clone()),
                token: Some(cfg.token.clone()),
                source: cfg.source.clone(),
                timestamp,
                device_info: Some(cfg.device_info.clone()),
            },
        }
    }
}

/// Per-run configuration, built once from CLI arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowConfig {
    pub variant: Variant,
    pub endpoint: String,
    pub source: String,
    /// Time spent in `Validating` before the form is revealed.
    #[serde(with = "humantime_serde")]
    pub reveal_delay: Duration,
    /// Token read from the invocation context. Absent means empty, which the
    /// gate denies by default.
    pub token: String,
    pub user_agent: String,
    pub device_info: String,
}

/// Size of a celebration burst. Reveal gets the small one, success the big one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Celebration {
    Reveal,
    Jackpot,
}

/// Events emitted by the controller and consumed by presentation layers.
#[derive(Debug, Clone)]
pub enum WorkflowEvent {
    StatusChanged { status: WorkflowStatus },
    Celebrate(Celebration),
    Info(InfoEvent),
}

/// Structured info events rendered by the UI or routed to stderr in text mode.
#[derive(Debug, Clone)]
pub enum InfoEvent {
    Message(String),
    /// The advisory startup check on the QR token. Never blocks the form.
    TokenScanned { valid: bool },
    /// Submit refused at the gate; no request was sent.
    GateDenied,
    /// Submit ignored because a request is already in flight.
    AlreadySending,
    /// The submission came back failed, with the generic retry hint.
    SubmissionFailed,
}

impl InfoEvent {
    /// Render a human-readable message for UI/CLI layers.
    pub fn to_message(&self) -> String {
        match self {
            InfoEvent::Message(msg) => msg.clone(),
            InfoEvent::TokenScanned { valid } => {
                if *valid {
                    "Ticket signature recognized".to_string()
                } else {
                    "Ticket signature pending verification".to_string()
                }
            }
            InfoEvent::GateDenied => {
                "ERREUR DE SÉCURITÉ : token invalide. Scannez le QR Code officiel du ticket."
                    .to_string()
            }
            InfoEvent::AlreadySending => "Submission already in flight".to_string(),
            InfoEvent::SubmissionFailed => "Connection error, please retry.".to_string(),
        }
    }
}

/// Final outcome document printed by `--json` mode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub timestamp_utc: String,
    pub variant: Variant,
    pub endpoint: String,
    pub source: String,
    pub status: WorkflowStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(variant: Variant) -> WorkflowConfig {
        WorkflowConfig {
            variant,
            endpoint: variant.endpoint().to_string(),
            source: variant.source().to_string(),
            reveal_delay: variant.default_reveal_delay(),
            token: "MOUNTAIN-SECURE-2026".to_string(),
            user_agent: "chasse-tresor-cli/test".to_string(),
            device_info: "chasse-tresor-cli/test (linux x86_64)".to_string(),
        }
    }

    #[test]
    fn signup_payload_has_only_email_source_timestamp() {
        let cfg = test_config(Variant::Signup);
        let form = EntryForm {
            email: "agent@example.com".to_string(),
            ..Default::default()
        };
        let payload = SubmissionPayload::assemble(&cfg, &form, "2026-02-28T05:00:00Z".to_string());
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj.len(), 3);
        assert_eq!(obj["email"], "agent@example.com");
        assert_eq!(obj["source"], SIGNUP_SOURCE);
        assert_eq!(obj["timestamp"], "2026-02-28T05:00:00Z");
    }

    #[test]
    fn claim_payload_carries_identity_and_device_info() {
        let cfg = test_config(Variant::Claim);
        let form = EntryForm {
            prenom: "Michaël".to_string(),
            nom: "Kaeser".to_string(),
            ..Default::default()
        };
        let payload = SubmissionPayload::assemble(&cfg, &form, "2026-03-01T09:30:00Z".to_string());
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["nom"], "Kaeser");
        assert_eq!(obj["prenom"], "Michaël");
        assert_eq!(obj["source"], CLAIM_SOURCE);
        assert!(obj.contains_key("deviceInfo"));
        assert!(!obj.contains_key("email"));
        assert!(!obj.contains_key("token"));
    }

    #[test]
    fn gated_claim_payload_adds_email_and_token() {
        let cfg = test_config(Variant::GatedClaim);
        let form = EntryForm {
            prenom: "Michaël".to_string(),
            nom: "Kaeser".to_string(),
            email: "agent@neocard.ch".to_string(),
        };
        let payload = SubmissionPayload::assemble(&cfg, &form, "2026-03-01T09:30:00Z".to_string());
        let json = serde_json::to_value(&payload).unwrap();
        let obj = json.as_object().unwrap();

        assert_eq!(obj["token"], "MOUNTAIN-SECURE-2026");
        assert_eq!(obj["email"], "agent@neocard.ch");
        assert_eq!(obj["nom"], "Kaeser");
        assert_eq!(obj["prenom"], "Michaël");
        assert!(obj.contains_key("deviceInfo"));
    }

    #[test]
    fn form_completeness_follows_variant_requirements() {
        let mut form = EntryForm::default();
        assert!(!form.is_complete(Variant::Signup));

        form.email = "agent@example.com".to_string();
        assert!(form.is_complete(Variant::Signup));
        assert!(!form.is_complete(Variant::Claim));

        form.prenom = "Jean".to_string();
        form.nom = "Dupont".to_string();
        assert!(form.is_complete(Variant::Claim));
        assert!(form.is_complete(Variant::GatedClaim));

        // Whitespace-only values do not count as filled.
        form.nom = "   ".to_string();
        assert!(!form.is_complete(Variant::Claim));
    }

    #[test]
    fn status_predicates() {
        assert!(WorkflowStatus::Success.is_terminal());
        assert!(!WorkflowStatus::Error.is_terminal());
        assert!(WorkflowStatus::Idle.can_submit());
        assert!(WorkflowStatus::Error.can_submit());
        assert!(!WorkflowStatus::Validating.can_submit());
        assert!(!WorkflowStatus::Sending.can_submit());
        assert!(!WorkflowStatus::Success.can_submit());
    }
}

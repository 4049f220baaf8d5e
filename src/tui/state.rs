use crate::cli::Cli;
use crate::model::{Field, Variant, WorkflowStatus};
use std::time::Instant;

/// A single-line text input with a cursor, one per form field.
pub struct FieldInput {
    pub field: Field,
    pub value: String,
    pub cursor: usize,
}

impl FieldInput {
    fn new(field: Field, initial: Option<&str>) -> Self {
        let value = initial.unwrap_or_default().to_string();
        Self {
            field,
            cursor: value.chars().count(),
            value,
        }
    }

    pub fn insert(&mut self, c: char) {
        let byte_idx = byte_index(&self.value, self.cursor);
        self.value.insert(byte_idx, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor == 0 {
            return;
        }
        let byte_idx = byte_index(&self.value, self.cursor - 1);
        self.value.remove(byte_idx);
        self.cursor -= 1;
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.value.chars().count());
    }
}

/// Byte offset of the `char_idx`-th character; input values are short enough
/// that the linear scan never matters.
fn byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct UiState {
    pub variant: Variant,
    pub status: WorkflowStatus,
    pub info: String,
    /// Gate-denial banner; sticks until the next submit attempt.
    pub alert: Option<String>,
    pub inputs: Vec<FieldInput>,
    pub focus: usize,
    pub show_help: bool,
    pub run_start: Instant,
}

impl UiState {
    pub fn new(args: &Cli) -> Self {
        let variant = args.mode;
        let inputs = variant
            .required_fields()
            .iter()
            .map(|f| {
                let prefill = match f {
                    Field::Prenom => args.prenom.as_deref(),
                    Field::Nom => args.nom.as_deref(),
                    Field::Email => args.email.as_deref(),
                };
                FieldInput::new(*f, prefill)
            })
            .collect();

        Self {
            variant,
            status: WorkflowStatus::Validating,
            info: String::new(),
            alert: None,
            inputs,
            focus: 0,
            show_help: false,
            run_start: Instant::now(),
        }
    }

    pub fn focused_mut(&mut self) -> Option<&mut FieldInput> {
        let idx = self.focus;
        self.inputs.get_mut(idx)
    }

    pub fn focus_next(&mut self) {
        if !self.inputs.is_empty() {
            self.focus = (self.focus + 1) % self.inputs.len();
        }
    }

    pub fn focus_prev(&mut self) {
        if !self.inputs.is_empty() {
            self.focus = (self.focus + self.inputs.len() - 1) % self.inputs.len();
        }
    }

    /// The rendering-layer required-field check run before a submit is sent.
    pub fn form_complete(&self) -> bool {
        self.inputs.iter().all(|i| !i.value.trim().is_empty())
    }

    /// The form accepts edits and submits outside of the terminal and
    /// validating phases.
    pub fn form_visible(&self) -> bool {
        matches!(
            self.status,
            WorkflowStatus::Idle | WorkflowStatus::Sending | WorkflowStatus::Error
        )
    }
}

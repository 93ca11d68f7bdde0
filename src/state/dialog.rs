//! Confirmation dialog for inventory status changes and deletes

use crate::api::ProductStatus;

/// What a confirmed dialog does
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmTarget {
    Status(ProductStatus),
    Delete,
}

impl ConfirmTarget {
    pub fn verb(&self) -> String {
        match self {
            Self::Status(status) => format!("mark as {}", status.label()),
            Self::Delete => "delete".to_string(),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, Self::Delete)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmDialogState {
    Single {
        id: String,
        name: String,
        target: ConfirmTarget,
    },
    Bulk {
        ids: Vec<String>,
        target: ConfirmTarget,
    },
}

impl ConfirmDialogState {
    pub fn target(&self) -> ConfirmTarget {
        match self {
            Self::Single { target, .. } | Self::Bulk { target, .. } => *target,
        }
    }

    pub fn ids(&self) -> Vec<String> {
        match self {
            Self::Single { id, .. } => vec![id.clone()],
            Self::Bulk { ids, .. } => ids.clone(),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.target() {
            ConfirmTarget::Delete => "Confirm Delete",
            ConfirmTarget::Status(_) => "Confirm Status Change",
        }
    }

    pub fn message(&self) -> String {
        let verb = self.target().verb();
        match self {
            Self::Single { name, .. } => format!("Are you sure you want to {verb} \"{name}\"?"),
            Self::Bulk { ids, .. } => {
                let noun = if ids.len() == 1 { "product" } else { "products" };
                format!("Are you sure you want to {verb} {} {noun}?", ids.len())
            }
        }
    }
}

/// An open dialog and which button is highlighted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmDialog {
    pub request: ConfirmDialogState,
    /// `true` when the confirm button is highlighted; starts on Cancel
    pub confirm_selected: bool,
}

impl ConfirmDialog {
    pub fn new(request: ConfirmDialogState) -> Self {
        Self {
            request,
            confirm_selected: false,
        }
    }

    pub fn toggle_selection(&mut self) {
        self.confirm_selected = !self.confirm_selected;
    }
}

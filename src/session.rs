//! Session-scoped selection state and the cart.
//!
//! One upload-to-checkout journey owns exactly one `SessionStore`; pages
//! mutate it through typed methods instead of ambient key lookups.

use crate::catalog::special_filament_name;
use uuid::Uuid;

/// Neutral color used to render a multi-color preview; never priced.
pub const MULTI_COLOR_PREVIEW_HEX: &str = "#cccccc";

/// Quality selected when the user has not touched the quality picker.
pub const DEFAULT_QUALITY: &str = "standard";

/// Color mode of the current selection. Exactly one branch can be active,
/// so switching modes can never leave two of them set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ColorSelection {
    /// A standard catalog color, by hex value.
    Standard { hex: String },
    /// A special filament (rainbow, glow, ...), by id.
    Special { filament_id: String },
    /// Multi-color print; free-text requirements for the shop to review.
    MultiColor { details: String },
}

impl ColorSelection {
    /// Label for quote and cart rows.
    pub fn label(&self) -> String {
        match self {
            ColorSelection::Standard { hex } => hex.clone(),
            ColorSelection::Special { filament_id } => {
                format!("Special: {}", special_filament_name(filament_id))
            }
            ColorSelection::MultiColor { .. } => "Multi-Color".to_string(),
        }
    }
}

/// Everything the user has picked for the current job.
#[derive(Clone, Debug, Default)]
pub struct Selection {
    pub color: Option<ColorSelection>,
    pub material_id: Option<String>,
    /// Empty means the default quality.
    pub quality_id: String,
}

impl Selection {
    pub fn quality_id(&self) -> &str {
        if self.quality_id.is_empty() {
            DEFAULT_QUALITY
        } else {
            &self.quality_id
        }
    }

    pub fn is_multi_color(&self) -> bool {
        matches!(self.color, Some(ColorSelection::MultiColor { .. }))
    }

    /// Hex color for the 3D preview. Multi-color renders the neutral
    /// placeholder; no selection falls back to the same neutral.
    pub fn preview_hex(&self) -> &str {
        match &self.color {
            Some(ColorSelection::Standard { hex }) => hex,
            _ => MULTI_COLOR_PREVIEW_HEX,
        }
    }
}

/// Frozen snapshot taken when the user adds the quote to the cart. Later
/// selection changes do not reach items already stored.
#[derive(Clone, Debug)]
pub struct CartItem {
    pub id: Uuid,
    pub model_name: String,
    pub color_label: String,
    pub material_id: String,
    pub quality_id: String,
    pub multi_color_details: String,
    pub quantity: u32,
    pub is_multi_part: bool,
    /// Final payable amount for this line, as quoted.
    pub price: f64,
}

/// Per-session state: the current flow plus the accumulated cart.
#[derive(Debug, Default)]
pub struct SessionStore {
    pub uploaded_model: Option<String>,
    pub job_id: Option<String>,
    pub selection: Selection,
    cart: Vec<CartItem>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the accepted upload this session is about.
    pub fn begin_job(&mut self, model_name: String, job_id: String) {
        self.uploaded_model = Some(model_name);
        self.job_id = Some(job_id);
    }

    /// Pick a standard color, dropping any special filament or multi-color
    /// mode that was active.
    pub fn select_color(&mut self, hex: String) {
        self.selection.color = Some(ColorSelection::Standard { hex });
    }

    /// Pick a special filament, dropping the other two color modes.
    pub fn select_special_filament(&mut self, filament_id: String) {
        self.selection.color = Some(ColorSelection::Special { filament_id });
    }

    /// Switch to multi-color mode. A previously chosen standard color is not
    /// remembered; leaving multi-color requires reselecting.
    pub fn enable_multi_color(&mut self, details: String) {
        self.selection.color = Some(ColorSelection::MultiColor { details });
    }

    /// Leave multi-color mode without restoring any earlier color.
    pub fn disable_multi_color(&mut self) {
        if self.selection.is_multi_color() {
            self.selection.color = None;
        }
    }

    pub fn select_material(&mut self, material_id: String) {
        self.selection.material_id = Some(material_id);
    }

    pub fn select_quality(&mut self, quality_id: String) {
        self.selection.quality_id = quality_id;
    }

    /// Clear the flow state when the user re-enters the upload entry point.
    /// The cart survives so checkout can still read earlier items.
    pub fn reset_flow(&mut self) {
        self.uploaded_model = None;
        self.job_id = None;
        self.selection = Selection::default();
    }

    /// Freeze the current quote into the cart. Order-preserving; duplicates
    /// are allowed.
    pub fn add_to_cart(&mut self, quantity: u32, is_multi_part: bool, price: f64) {
        let details = match &self.selection.color {
            Some(ColorSelection::MultiColor { details }) => details.clone(),
            _ => String::new(),
        };
        let item = CartItem {
            id: Uuid::new_v4(),
            model_name: self
                .uploaded_model
                .clone()
                .unwrap_or_else(|| "Unknown Model".to_string()),
            color_label: self
                .selection
                .color
                .as_ref()
                .map(ColorSelection::label)
                .unwrap_or_default(),
            material_id: self.selection.material_id.clone().unwrap_or_default(),
            quality_id: self.selection.quality_id().to_string(),
            multi_color_details: details,
            quantity,
            is_multi_part,
            price,
        };
        self.cart.push(item);
    }

    pub fn cart(&self) -> &[CartItem] {
        &self.cart
    }

    pub fn cart_total(&self) -> f64 {
        self.cart.iter().map(|i| i.price).sum()
    }

    pub fn remove_cart_item(&mut self, index: usize) {
        if index < self.cart.len() {
            self.cart.remove(index);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_modes_are_mutually_exclusive() {
        let mut s = SessionStore::new();
        s.select_color("#ff0000".into());
        s.select_special_filament("glow".into());
        assert_eq!(
            s.selection.color,
            Some(ColorSelection::Special {
                filament_id: "glow".into()
            })
        );

        s.enable_multi_color("red body, blue lid".into());
        assert!(s.selection.is_multi_color());

        // Back to a standard color clears the multi-color branch.
        s.select_color("#0000ff".into());
        assert!(!s.selection.is_multi_color());
        assert_eq!(
            s.selection.color,
            Some(ColorSelection::Standard {
                hex: "#0000ff".into()
            })
        );
    }

    #[test]
    fn test_multi_color_preview_uses_placeholder() {
        let mut s = SessionStore::new();
        s.enable_multi_color(String::new());
        assert_eq!(s.selection.preview_hex(), MULTI_COLOR_PREVIEW_HEX);
    }

    #[test]
    fn test_disabling_multi_color_does_not_restore_color() {
        let mut s = SessionStore::new();
        s.select_color("#ff0000".into());
        s.enable_multi_color(String::new());
        s.disable_multi_color();
        assert_eq!(s.selection.color, None);
        assert_eq!(s.selection.preview_hex(), MULTI_COLOR_PREVIEW_HEX);
    }

    #[test]
    fn test_quality_defaults_to_standard() {
        let s = SessionStore::new();
        assert_eq!(s.selection.quality_id(), "standard");
    }

    #[test]
    fn test_reset_flow_clears_selection_but_keeps_cart() {
        let mut s = SessionStore::new();
        s.begin_job("widget.stl".into(), "job-1".into());
        s.select_color("#ffffff".into());
        s.select_material("pla".into());
        s.add_to_cart(2, false, 40.0);

        s.reset_flow();
        assert!(s.uploaded_model.is_none());
        assert!(s.job_id.is_none());
        assert!(s.selection.color.is_none());
        assert!(s.selection.material_id.is_none());
        assert_eq!(s.cart().len(), 1);
    }

    #[test]
    fn test_cart_items_are_frozen_snapshots() {
        let mut s = SessionStore::new();
        s.begin_job("widget.stl".into(), "job-1".into());
        s.select_color("#ffffff".into());
        s.select_material("pla".into());
        s.add_to_cart(1, false, 25.0);

        // Mutating the selection afterwards must not touch the stored item.
        s.select_material("abs".into());
        s.select_color("#000000".into());
        assert_eq!(s.cart()[0].material_id, "pla");
        assert_eq!(s.cart()[0].color_label, "#ffffff");
    }

    #[test]
    fn test_cart_allows_duplicates_and_preserves_order() {
        let mut s = SessionStore::new();
        s.begin_job("widget.stl".into(), "job-1".into());
        s.add_to_cart(1, false, 25.0);
        s.add_to_cart(1, false, 25.0);
        s.add_to_cart(3, true, 67.5);
        assert_eq!(s.cart().len(), 3);
        assert!((s.cart_total() - 117.5).abs() < 1e-9);
        s.remove_cart_item(1);
        assert_eq!(s.cart().len(), 2);
        assert!((s.cart_total() - 92.5).abs() < 1e-9);
    }
}

//! Materials/colors/quality catalog as served by the backend.

use serde::{Deserialize, Serialize};

/// One filament color stocked for a material.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Color {
    pub id: String,
    pub name: String,
    pub hex: String,
    #[serde(default)]
    pub addon_price: f64,
}

/// One printable material and its color stock.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Material {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub properties: Vec<String>,
    #[serde(default)]
    pub base_cost_per_gram: f64,
    #[serde(default)]
    pub hourly_rate: f64,
    #[serde(default)]
    pub colors: Vec<Color>,
}

impl Material {
    /// Multi-color jobs need at least two colors on the spool rack.
    pub fn supports_multi_color(&self) -> bool {
        self.colors.len() >= 2
    }
}

/// Quality level entry from the catalog, display-labelling only; the
/// backend-reported quality_modifier stays authoritative for pricing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QualityLevel {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub layer_height: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub price_modifier: f64,
}

/// Shop-wide pricing knobs.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GlobalSettings {
    #[serde(default)]
    pub support_material_multiplier: f64,
    #[serde(default)]
    pub minimum_price: f64,
    #[serde(default)]
    pub default_fill_density: f64,
    #[serde(default)]
    pub quality_levels: Option<Vec<QualityLevel>>,
    #[serde(default)]
    pub volume_multiplier: Option<f64>,
    #[serde(default)]
    pub markup_percentage: Option<f64>,
    #[serde(default)]
    pub rush_order_fee: Option<f64>,
}

/// Payload of `GET /api/materials`, also posted back by the admin editor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CatalogData {
    pub materials: Vec<Material>,
    pub global_settings: GlobalSettings,
}

impl CatalogData {
    pub fn material(&self, material_id: &str) -> Option<&Material> {
        self.materials.iter().find(|m| m.id == material_id)
    }

    /// Quality levels for the selector, falling back to the built-in table
    /// when the backend does not publish one.
    pub fn quality_levels(&self) -> Vec<QualityLevel> {
        match &self.global_settings.quality_levels {
            Some(levels) if !levels.is_empty() => levels.clone(),
            _ => default_quality_levels(),
        }
    }
}

/// Built-in quality table matching the shop defaults.
pub fn default_quality_levels() -> Vec<QualityLevel> {
    let entry = |id: &str, name: &str, layer: &str, modifier: f64| QualityLevel {
        id: id.into(),
        name: name.into(),
        layer_height: layer.into(),
        description: String::new(),
        price_modifier: modifier,
    };
    vec![
        entry("draft", "Draft", "0.3mm", -5.0),
        entry("standard", "Standard", "0.2mm", 0.0),
        entry("high", "High Quality", "0.12mm", 10.0),
        entry("ultra", "Ultra Fine", "0.08mm", 15.0),
    ]
}

/// Special filaments offered in the color selector. Pricing comes from the
/// backend `color_addon`; these only drive the labels.
pub fn special_filaments() -> Vec<(&'static str, &'static str)> {
    vec![
        ("rainbow", "Rainbow PLA"),
        ("galaxy", "Galaxy PLA"),
        ("marble", "Marble PLA"),
        ("glow", "Glow-in-Dark"),
        ("silk", "Silk Metallic"),
        ("wood", "Wood Composite"),
    ]
}

/// Display name for a special filament id.
pub fn special_filament_name(id: &str) -> String {
    special_filaments()
        .iter()
        .find(|(fid, _)| *fid == id)
        .map(|(_, name)| (*name).to_string())
        .unwrap_or_else(|| id.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_decodes_with_optional_settings() {
        let data: CatalogData = serde_json::from_str(
            r##"{
                "materials": [{
                    "id": "pla", "name": "PLA",
                    "base_cost_per_gram": 0.05, "hourly_rate": 2.0,
                    "colors": [
                        {"id": "white", "name": "White", "hex": "#ffffff"},
                        {"id": "red", "name": "Red", "hex": "#ff0000", "addon_price": 5.0}
                    ]
                }],
                "global_settings": {
                    "support_material_multiplier": 1.2,
                    "minimum_price": 10.0,
                    "default_fill_density": 0.15
                }
            }"##,
        )
        .unwrap();
        let pla = data.material("pla").unwrap();
        assert!(pla.supports_multi_color());
        assert_eq!(pla.colors[0].addon_price, 0.0);
        assert_eq!(pla.colors[1].addon_price, 5.0);
        assert!(data.global_settings.markup_percentage.is_none());
        // No quality_levels published: the built-in table steps in.
        assert_eq!(data.quality_levels().len(), 4);
    }

    #[test]
    fn test_published_quality_levels_win_over_defaults() {
        let data: CatalogData = serde_json::from_str(
            r#"{
                "materials": [],
                "global_settings": {
                    "quality_levels": [
                        {"id": "draft", "name": "Draft", "price_modifier": -3.0}
                    ]
                }
            }"#,
        )
        .unwrap();
        let levels = data.quality_levels();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].price_modifier, -3.0);
    }

    #[test]
    fn test_single_color_material_rejects_multi_color() {
        let m = Material {
            id: "tpu".into(),
            name: "TPU".into(),
            description: String::new(),
            properties: vec![],
            base_cost_per_gram: 0.1,
            hourly_rate: 3.0,
            colors: vec![Color {
                id: "black".into(),
                name: "Black".into(),
                hex: "#000000".into(),
                addon_price: 0.0,
            }],
        };
        assert!(!m.supports_multi_color());
    }

    #[test]
    fn test_special_filament_labels() {
        assert_eq!(special_filament_name("glow"), "Glow-in-Dark");
        // Unknown ids fall through to the raw id rather than erroring.
        assert_eq!(special_filament_name("carbon"), "carbon");
    }
}

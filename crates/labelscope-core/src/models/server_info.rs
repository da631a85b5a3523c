use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

// ─── ServerInfo ────────────────────────────────────────────

/// Capability metadata returned by the annotation server's info endpoint.
///
/// Fetched on connect, replaced wholesale on refresh, never persisted. A
/// failed refresh leaves the previously fetched value untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub version: String,

    /// Model name → descriptor for every model the server can run.
    #[serde(default)]
    pub models: HashMap<String, ModelInfo>,

    /// Active-learning strategy names the server exposes.
    #[serde(default)]
    pub strategies: HashMap<String, serde_json::Value>,

    /// Trainer names, present when the server supports training sessions.
    #[serde(default)]
    pub trainers: HashMap<String, serde_json::Value>,
}

impl ServerInfo {
    pub fn model(&self, name: &str) -> Option<&ModelInfo> {
        self.models.get(name)
    }

    /// Model names of one type, sorted for stable display order.
    pub fn models_of_type(&self, model_type: ModelType) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .models
            .iter()
            .filter(|(_, m)| m.model_type == model_type)
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }

    /// Models that accept user click guidance.
    pub fn interactive_models(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .models
            .iter()
            .filter(|(_, m)| m.model_type.is_interactive())
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

// ─── ModelInfo ─────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    #[serde(rename = "type")]
    pub model_type: ModelType,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default)]
    pub labels: LabelSet,

    #[serde(default)]
    pub description: String,

    /// Server-side knobs echoed in the descriptor; opaque to the client.
    #[serde(default)]
    pub config: HashMap<String, serde_json::Value>,
}

fn default_dimension() -> u32 {
    3
}

/// Kind of task a model implements, as named by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelType {
    Segmentation,
    Deepgrow,
    Deepedit,
    Annotation,
    Scribbles,
    #[serde(other)]
    Other,
}

impl ModelType {
    /// Whether inference is guided by user clicks.
    pub fn is_interactive(self) -> bool {
        matches!(self, Self::Deepgrow | Self::Deepedit)
    }
}

// ─── LabelSet ──────────────────────────────────────────────

/// Label classes of a model. The server emits either an explicit name → id
/// mapping or a bare list of names; both shapes are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelSet {
    Named(BTreeMap<String, u32>),
    Listed(Vec<String>),
}

impl Default for LabelSet {
    fn default() -> Self {
        Self::Listed(Vec::new())
    }
}

impl LabelSet {
    pub fn len(&self) -> usize {
        match self {
            Self::Named(map) => map.len(),
            Self::Listed(names) => names.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `(id, name)` pairs ordered by id. List-shaped labels are numbered
    /// from 1 in list order; 0 is reserved for background.
    pub fn entries(&self) -> Vec<(u32, String)> {
        match self {
            Self::Named(map) => {
                let mut entries: Vec<(u32, String)> =
                    map.iter().map(|(name, &id)| (id, name.clone())).collect();
                entries.sort_unstable_by_key(|(id, _)| *id);
                entries
            }
            Self::Listed(names) => names
                .iter()
                .enumerate()
                .map(|(i, name)| (i as u32 + 1, name.clone()))
                .collect(),
        }
    }

    pub fn id_of(&self, name: &str) -> Option<u32> {
        self.entries()
            .into_iter()
            .find(|(_, n)| n == name)
            .map(|(id, _)| id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_info_payload() {
        let json = r#"{
            "name": "Segmentation - Spleen",
            "description": "Active learning spleen segmentation",
            "version": "0.1.0",
            "models": {
                "segmentation_spleen": {
                    "type": "segmentation",
                    "dimension": 3,
                    "labels": { "spleen": 1 },
                    "description": "Spleen over 3D CT"
                },
                "deepgrow_3d": {
                    "type": "deepgrow",
                    "labels": ["spleen"]
                }
            },
            "strategies": { "random": {}, "first": {} }
        }"#;

        let info: ServerInfo = serde_json::from_str(json).unwrap();
        assert_eq!(info.models.len(), 2);
        assert_eq!(info.models_of_type(ModelType::Segmentation), vec!["segmentation_spleen"]);
        assert_eq!(info.interactive_models(), vec!["deepgrow_3d"]);
        assert_eq!(info.strategies.len(), 2);

        // deepgrow_3d omits dimension; default applies
        assert_eq!(info.model("deepgrow_3d").unwrap().dimension, 3);
    }

    #[test]
    fn unknown_model_type_tolerated() {
        let json = r#"{ "type": "pipeline", "labels": [] }"#;
        let model: ModelInfo = serde_json::from_str(json).unwrap();
        assert_eq!(model.model_type, ModelType::Other);
        assert!(!model.model_type.is_interactive());
    }

    #[test]
    fn label_set_both_shapes() {
        let named: LabelSet = serde_json::from_str(r#"{ "liver": 1, "tumor": 2 }"#).unwrap();
        assert_eq!(
            named.entries(),
            vec![(1, "liver".to_string()), (2, "tumor".to_string())]
        );
        assert_eq!(named.id_of("tumor"), Some(2));

        let listed: LabelSet = serde_json::from_str(r#"["left atrium", "aorta"]"#).unwrap();
        assert_eq!(
            listed.entries(),
            vec![(1, "left atrium".to_string()), (2, "aorta".to_string())]
        );
        assert_eq!(listed.id_of("background"), None);
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::entity::AssetId;
use crate::error::{NoteError, Result};

/// The device a widget instance is attached to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRef {
    pub id: AssetId,
    #[serde(default)]
    pub name: String,
}

/// Widget configuration as stored by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WidgetConfig {
    #[serde(default)]
    pub device: Option<DeviceRef>,
}

impl WidgetConfig {
    /// Create a config targeting one device.
    pub fn for_device(id: impl Into<AssetId>, name: impl Into<String>) -> Self {
        Self {
            device: Some(DeviceRef {
                id: id.into(),
                name: name.into(),
            }),
        }
    }

    /// Read a config from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// The configured device, or `MissingDevice`.
    pub fn device(&self) -> Result<&DeviceRef> {
        self.device.as_ref().ok_or(NoteError::MissingDevice)
    }
}

/// Registration metadata for dashboards that list available widgets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WidgetDescriptor {
    pub id: &'static str,
    pub label: &'static str,
    pub description: &'static str,
    /// The widget cannot be placed without picking a device
    pub requires_device: bool,
    /// Device groups may be picked as the target
    pub groups_selectable: bool,
}

pub const NOTE_WIDGET: WidgetDescriptor = WidgetDescriptor {
    id: "c8y.note.widget",
    label: "Note Widget",
    description: "",
    requires_device: true,
    groups_selectable: true,
};

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_dashboard_config() {
        let config: WidgetConfig =
            serde_json::from_str(r#"{"device":{"id":"123456","name":"Device A"}}"#).unwrap();
        let device = config.device().unwrap();
        assert_eq!(device.id.as_str(), "123456");
        assert_eq!(device.name, "Device A");
    }

    #[test]
    fn test_missing_device() {
        let config: WidgetConfig = serde_json::from_str("{}").unwrap();
        assert!(matches!(config.device(), Err(NoteError::MissingDevice)));
        assert!(matches!(
            WidgetConfig::default().device(),
            Err(NoteError::MissingDevice)
        ));
    }

    #[test]
    fn test_load_from_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("widget.json");
        let config = WidgetConfig::for_device("42", "Pump 7");
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert_eq!(WidgetConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_descriptor() {
        assert_eq!(NOTE_WIDGET.id, "c8y.note.widget");
        assert!(NOTE_WIDGET.requires_device);
    }
}

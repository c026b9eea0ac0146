use crate::services::store::SettingsStore;
use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Severity of the single-slot status message
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Ok,
    Error,
}

/// Last-write-wins notification shown next to the panel actions
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct StatusMessage {
    pub text: String,
    pub severity: Severity,
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self {
            text: String::new(),
            severity: Severity::Info,
        }
    }
}

/// The fixed field set of the settings panel
///
/// Serialized names double as the store keys and the wire names, so the
/// key space stays `serial, hwClass, hwVersion, fwVersion, wifiSsid,
/// wifiPass, mqttUri, mqttUser, mqttPass`.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FieldValues {
    // Read-only identifiers
    pub serial: String,
    pub hw_class: String,
    pub hw_version: String,
    pub fw_version: String,

    // Editable while the panel is unlocked
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub mqtt_uri: String,
    pub mqtt_user: String,
    pub mqtt_pass: String,
}

impl FieldValues {
    /// Load every field from the store; a missing key reads as empty string.
    /// fwVersion has no store key and always loads empty.
    pub fn load(store: &impl SettingsStore) -> Result<Self> {
        Ok(Self {
            serial: store.get("serial")?.unwrap_or_default(),
            hw_class: store.get("hwClass")?.unwrap_or_default(),
            hw_version: store.get("hwVersion")?.unwrap_or_default(),
            fw_version: String::new(),
            wifi_ssid: store.get("wifiSsid")?.unwrap_or_default(),
            wifi_pass: store.get("wifiPass")?.unwrap_or_default(),
            mqtt_uri: store.get("mqttUri")?.unwrap_or_default(),
            mqtt_user: store.get("mqttUser")?.unwrap_or_default(),
            mqtt_pass: store.get("mqttPass")?.unwrap_or_default(),
        })
    }

    /// Key/value pairs written on save. Display fields are persisted too,
    /// with fwVersion excluded.
    fn persisted(&self) -> [(&'static str, &str); 8] {
        [
            ("serial", &self.serial),
            ("hwClass", &self.hw_class),
            ("hwVersion", &self.hw_version),
            ("wifiSsid", &self.wifi_ssid),
            ("wifiPass", &self.wifi_pass),
            ("mqttUri", &self.mqtt_uri),
            ("mqttUser", &self.mqtt_user),
            ("mqttPass", &self.mqtt_pass),
        ]
    }
}

/// Which panel actions the page should currently offer
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionVisibility {
    pub edit: bool,
    pub save: bool,
    pub cancel: bool,
    pub update_ui: bool,
}

/// View model rendered by the settings page
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelView {
    pub edit_mode: bool,
    pub fields_locked: bool,
    pub fields: FieldValues,
    pub actions: ActionVisibility,
    pub status: StatusMessage,
}

/// Settings panel state machine
///
/// Owns the edit-mode flag, the current field values and the status slot.
/// All persistence goes through the injected [`SettingsStore`], so the
/// transitions can be exercised without a server or a filesystem.
#[derive(Debug, Default)]
pub struct SettingsPanel {
    edit_mode: bool,
    fields: FieldValues,
    status: StatusMessage,
}

impl SettingsPanel {
    /// Reset to view mode and load all displayed values from the store
    ///
    /// Runs on every page load. Missing keys display as empty strings.
    pub fn initialize(&mut self, store: &impl SettingsStore) -> Result<()> {
        self.edit_mode = false;
        self.fields = FieldValues::load(store)?;
        self.status = StatusMessage::default();
        Ok(())
    }

    /// Unlock the editable fields
    pub fn enter_edit_mode(&mut self) {
        self.edit_mode = true;
        self.set_status("Edit mode enabled.", Severity::Info);
    }

    /// Persist the submitted values and leave edit mode
    ///
    /// Overwrites every persisted key unconditionally, last write wins.
    pub fn save(&mut self, store: &impl SettingsStore, submitted: FieldValues) -> Result<()> {
        self.persist_fields(store, submitted)?;
        self.complete_save();
        Ok(())
    }

    /// First half of a save: take over the submitted values and write them
    /// to the store while staying in edit mode. Used when a device submit
    /// still has to happen before the save can complete.
    pub fn persist_fields(
        &mut self,
        store: &impl SettingsStore,
        submitted: FieldValues,
    ) -> Result<()> {
        self.fields = submitted;

        for (key, value) in self.fields.persisted() {
            store.set(key, value)?;
        }

        Ok(())
    }

    /// Second half of a save: leave edit mode and report success
    pub fn complete_save(&mut self) {
        self.edit_mode = false;
        self.set_status("Settings saved.", Severity::Ok);
    }

    /// A device submit failed after the store was already written: report
    /// the error and stay in edit mode.
    pub fn fail_save(&mut self, reason: &str) {
        self.set_status(format!("Save failed: {reason}"), Severity::Error);
    }

    /// Leave edit mode and revert all fields to their stored values
    pub fn cancel(&mut self, store: &impl SettingsStore) -> Result<()> {
        self.edit_mode = false;
        self.fields = FieldValues::load(store)?;
        self.set_status("Changes discarded.", Severity::Info);
        Ok(())
    }

    pub fn set_status(&mut self, text: impl Into<String>, severity: Severity) {
        self.status = StatusMessage {
            text: text.into(),
            severity,
        };
    }

    pub fn edit_mode(&self) -> bool {
        self.edit_mode
    }

    pub fn fields(&self) -> &FieldValues {
        &self.fields
    }

    pub fn status(&self) -> &StatusMessage {
        &self.status
    }

    pub fn view(&self) -> PanelView {
        PanelView {
            edit_mode: self.edit_mode,
            fields_locked: !self.edit_mode,
            fields: self.fields.clone(),
            actions: ActionVisibility {
                edit: !self.edit_mode,
                save: self.edit_mode,
                cancel: self.edit_mode,
                update_ui: !self.edit_mode,
            },
            status: self.status.clone(),
        }
    }
}

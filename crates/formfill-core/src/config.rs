//! Fill options supplied alongside a template
//!
//! Button option names depend on how a template was authored, so the
//! symbolic `"Yes"`/`"No"` vocabulary is resolved through [`ButtonStates`]
//! instead of being baked into the updater.

use serde::Deserialize;

/// Per-template options for generating filled documents.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FillOptions {
    /// 0-based index of the template page holding the fillable fields.
    ///
    /// Every page before it is treated as a header page when merging.
    pub form_page: usize,
    /// Button vocabulary of the template.
    pub button_states: ButtonStates,
    /// Separator placed between a field name and the record id.
    pub name_separator: String,
}

impl Default for FillOptions {
    fn default() -> Self {
        Self {
            form_page: 0,
            button_states: ButtonStates::default(),
            name_separator: "###".to_string(),
        }
    }
}

impl FillOptions {
    /// Suffix appended to every field name for the given record id.
    pub fn suffix_for(&self, record_id: &str) -> String {
        format!("{}{}", self.name_separator, record_id)
    }
}

/// Mapping from caller values to button appearance-state names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ButtonStates {
    /// Radio option selected by the symbolic value `"Yes"`.
    pub yes: String,
    /// Radio option selected by the symbolic value `"No"`.
    pub no: String,
    /// Marker that turns a value into a literal option name (`"/Yes"`, `"/0"`).
    pub raw_prefix: String,
    /// Appearance state of a checked checkbox.
    pub checkbox_on: String,
    /// Appearance state of an unchecked checkbox.
    pub checkbox_off: String,
}

impl Default for ButtonStates {
    fn default() -> Self {
        Self {
            yes: "0".to_string(),
            no: "1".to_string(),
            raw_prefix: "/".to_string(),
            checkbox_on: "Yes".to_string(),
            checkbox_off: "Off".to_string(),
        }
    }
}

impl ButtonStates {
    /// Option name written to a radio group for `value`.
    ///
    /// Symbolic `"Yes"`/`"No"` map to the configured options; a value carrying
    /// the raw prefix is used verbatim without it; anything else is taken as
    /// an option name as-is. Matching is case-sensitive.
    pub fn radio_state(&self, value: &str) -> Vec<u8> {
        let option = match value {
            "Yes" => self.yes.as_str(),
            "No" => self.no.as_str(),
            other => {
                if self.raw_prefix.is_empty() {
                    other
                } else {
                    other.strip_prefix(self.raw_prefix.as_str()).unwrap_or(other)
                }
            }
        };
        decode_name_escapes(option)
    }

    /// Appearance state written to a standalone checkbox for `value`.
    pub fn checkbox_state(&self, value: &str) -> Vec<u8> {
        if value == "Yes" {
            decode_name_escapes(&self.checkbox_on)
        } else {
            decode_name_escapes(&self.checkbox_off)
        }
    }
}

/// Decode `#xx` escapes so option names copied out of a PDF (`1#20Admin`)
/// are stored as the bytes they stand for.
fn decode_name_escapes(name: &str) -> Vec<u8> {
    let bytes = name.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'#' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3]).ok();
            if let Some(byte) = hex.and_then(|h| u8::from_str_radix(h, 16).ok()) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    out
}

use std::collections::BTreeMap;

use crate::models::{FieldKey, FieldMap};

/// Every spelling a template may use, mapped to its substitution value.
///
/// Each field is reachable through its canonical token (`PROTOCOL_NO`),
/// its session name (`protocolNo`) and its legacy labels. Custom values
/// fill in names no field claims; they never shadow a field spelling.
pub fn expand_aliases(
    fields: &FieldMap,
    custom: &BTreeMap<String, String>,
) -> BTreeMap<String, String> {
    let mut expanded: BTreeMap<String, String> = custom
        .iter()
        .map(|(name, value)| (name.trim().to_string(), value.clone()))
        .filter(|(name, _)| !name.is_empty())
        .collect();

    for key in FieldKey::ALL {
        let value = fields.get(key);
        let spellings = [key.token(), key.name()]
            .into_iter()
            .chain(key.aliases().iter().copied());
        for spelling in spellings {
            expanded.insert(spelling.to_string(), value.to_string());
        }
    }

    expanded
}

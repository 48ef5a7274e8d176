use serde_yaml::Value;

/// Recursively merge two YAML values.
///
/// Mappings are merged key by key; any other `overlay` value replaces `base`.
pub fn merge_yaml_values(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Mapping(base_map), Value::Mapping(overlay_map)) => {
            for (key, value) in overlay_map {
                if let Some(base_value) = base_map.get_mut(key) {
                    merge_yaml_values(base_value, value);
                } else {
                    base_map.insert(key.clone(), value.clone());
                }
            }
        }
        (base, overlay) => {
            *base = overlay.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_keys_merge_and_scalars_replace() -> serde_yaml::Result<()> {
        let mut base: Value = serde_yaml::from_str("a: {x: 1, y: 2}\nlist: [1, 2]")?;
        let overlay: Value = serde_yaml::from_str("a: {y: 3, z: 4}\nlist: [9]")?;
        merge_yaml_values(&mut base, &overlay);

        let expected: Value = serde_yaml::from_str("a: {x: 1, y: 3, z: 4}\nlist: [9]")?;
        assert_eq!(base, expected);
        Ok(())
    }
}

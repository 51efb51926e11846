use serde::{Deserialize, Serialize};

use crate::policy::AxisConventionPolicy;
use crate::user_data::AssetUserData;

pub const APPLY_AXIS_CONVERSION_KEY: &str = "applyAxisConversion";
pub const FLIP_Z_AXIS_KEY: &str = "flipZAxis";
/// Older assets stored the apply flag under this name.
pub const LEGACY_APPLY_KEY: &str = "applyBlenderAxisConversion";

/// Per-asset axis conversion flags.
///
/// Both flags read as `false` when absent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisConversionSettings {
    pub apply_axis_conversion: bool,
    pub flip_z_axis: bool,
}

impl AxisConversionSettings {
    /// Read both flags, falling back to the legacy apply key and then to defaults.
    ///
    /// A missing `flipZAxis` reads as `false`, except for stores that only carry
    /// the legacy apply key: the legacy converter always flipped the front axis.
    pub fn from_user_data(store: &AssetUserData) -> Self {
        let defaults = Self::default();
        let legacy_only = !store.contains_key(APPLY_AXIS_CONVERSION_KEY)
            && store.contains_key(LEGACY_APPLY_KEY);
        let legacy_apply = store.get_bool(LEGACY_APPLY_KEY, defaults.apply_axis_conversion);
        let flip_fallback = if legacy_only {
            legacy_apply
        } else {
            defaults.flip_z_axis
        };

        Self {
            apply_axis_conversion: store.get_bool(APPLY_AXIS_CONVERSION_KEY, legacy_apply),
            flip_z_axis: store.get_bool(FLIP_Z_AXIS_KEY, flip_fallback),
        }
    }

    /// Write both flags back under their current key names.
    pub fn write_to(&self, store: &mut AssetUserData) {
        store.set_value(APPLY_AXIS_CONVERSION_KEY, self.apply_axis_conversion);
        store.set_value(FLIP_Z_AXIS_KEY, self.flip_z_axis);
    }

    pub fn policy(&self) -> AxisConventionPolicy {
        AxisConventionPolicy::new(self.flip_z_axis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn given_empty_store_when_reading_settings_then_defaults_are_used() {
        let settings = AxisConversionSettings::from_user_data(&AssetUserData::default());

        assert!(!settings.apply_axis_conversion);
        assert!(!settings.flip_z_axis);
    }

    #[test]
    fn given_apply_key_without_flip_key_when_reading_settings_then_front_axis_is_not_flipped() {
        let store = AssetUserData::deserialize(r#"{"applyAxisConversion":true}"#).expect("blob");

        let settings = AxisConversionSettings::from_user_data(&store);

        assert!(settings.apply_axis_conversion);
        assert!(!settings.flip_z_axis);
    }

    #[test]
    fn given_legacy_key_only_when_reading_settings_then_conversion_applies_with_flip() {
        let store =
            AssetUserData::deserialize(r#"{"applyBlenderAxisConversion":true}"#).expect("blob");

        let settings = AxisConversionSettings::from_user_data(&store);
        assert!(settings.apply_axis_conversion);
        assert!(settings.flip_z_axis);
    }

    #[test]
    fn given_legacy_key_with_flip_key_when_reading_settings_then_flip_key_wins() {
        let store = AssetUserData::deserialize(
            r#"{"applyBlenderAxisConversion":true,"flipZAxis":false}"#,
        )
        .expect("blob");

        let settings = AxisConversionSettings::from_user_data(&store);
        assert!(settings.apply_axis_conversion);
        assert!(!settings.flip_z_axis);
    }

    #[test]
    fn given_both_keys_when_reading_settings_then_current_key_wins() {
        let store = AssetUserData::deserialize(
            r#"{"applyBlenderAxisConversion":true,"applyAxisConversion":false,"flipZAxis":false}"#,
        )
        .expect("blob");

        let settings = AxisConversionSettings::from_user_data(&store);
        assert!(!settings.apply_axis_conversion);
        assert!(!settings.flip_z_axis);
        assert!(!settings.policy().flip_z_axis());
    }

    #[test]
    fn given_settings_when_written_then_store_reads_them_back() {
        let mut store = AssetUserData::default();
        let settings = AxisConversionSettings {
            apply_axis_conversion: true,
            flip_z_axis: false,
        };

        settings.write_to(&mut store);

        assert!(store.is_dirty());
        assert_eq!(AxisConversionSettings::from_user_data(&store), settings);
    }
}

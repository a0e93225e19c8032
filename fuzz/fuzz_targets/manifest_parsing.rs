#![no_main]
use libfuzzer_sys::fuzz_target;
use modlink::unit::registry::UnitManifest;
use modlink::unit::validation::{ManifestValidator, ValidationResult};

fuzz_target!(|data: &[u8]| {
    // Manifests come from arbitrary checkouts; parsing must never panic
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };

    let Ok(manifest) = UnitManifest::parse(text) else {
        return;
    };

    // A parsed manifest always has a usable name
    assert!(!manifest.name.trim().is_empty());

    if let ValidationResult::Valid = ManifestValidator::new().validate(&manifest) {
        let unit = manifest.to_unit(std::path::Path::new("/fuzz/unit"));
        assert_eq!(unit.name, manifest.name);
        assert!(!unit.dependencies.contains(&unit.name));
    }
});

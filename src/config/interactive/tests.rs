use super::*;

#[test]
fn load_existing_config_always_yields_a_usable_config() {
    let config = load_existing_config().expect("config loaded successfully");
    assert!(!config.embeddings.api_base.is_empty());
    assert!(!config.embeddings.model.is_empty());
    assert!(config.embeddings.batch_size > 0);
}

#[test]
fn mask_api_key_redacts_the_middle() {
    assert_eq!(mask_api_key(""), "(not set)");
    assert_eq!(mask_api_key("short"), "*****");
    assert_eq!(mask_api_key("sk-abcdefghijklmnop"), "sk-a...mnop");
}

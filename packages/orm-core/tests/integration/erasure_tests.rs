//! Secure erasure of sensitive byte fields.

use ntest::timeout;
use pretty_assertions::assert_eq;

use orm_core::erasure::erase_with_schema;
use orm_core::{erase_sensitive, CodecError, DocumentCodec};

use super::helpers::{registry, sample_user, Everything, User};

#[timeout(1000)]
#[test]
fn test_erases_sensitive_buffers_in_place() {
    let registry = registry();
    let mut user = sample_user();
    let hash_ptr = user.password_hash.as_ptr();

    assert!(erase_sensitive(&registry, &mut user).unwrap());

    assert_eq!(user.password_hash, vec![0u8; 32]);
    assert_eq!(user.password_hash.as_ptr(), hash_ptr);
    assert_eq!(user.session_key.as_deref(), Some(&vec![0u8; 16]));
}

#[timeout(1000)]
#[test]
fn test_other_fields_untouched() {
    let registry = registry();
    let mut user = sample_user();
    erase_sensitive(&registry, &mut user).unwrap();

    let original = sample_user();
    assert_eq!(user.name, original.name);
    assert_eq!(user.email, original.email);
    assert_eq!(user.address, original.address);
    assert_eq!(user.cache, original.cache);
}

#[timeout(1000)]
#[test]
fn test_erasure_is_idempotent() {
    let registry = registry();
    let mut user = sample_user();

    erase_sensitive(&registry, &mut user).unwrap();
    let once = user.clone();
    assert!(erase_sensitive(&registry, &mut user).unwrap());
    assert_eq!(user, once);
}

#[timeout(1000)]
#[test]
fn test_nothing_to_erase() {
    let registry = registry();
    let mut user = User {
        password_hash: Vec::new(),
        session_key: None,
        ..sample_user()
    };
    assert!(!erase_sensitive(&registry, &mut user).unwrap());

    let mut everything = Everything::default();
    assert!(!erase_sensitive(&registry, &mut everything).unwrap());
}

#[timeout(1000)]
#[test]
fn test_erased_record_still_encodes() {
    let registry = registry();
    let codec = DocumentCodec::new(&registry);
    let mut user = sample_user();
    erase_sensitive(&registry, &mut user).unwrap();

    let doc = codec.encode(&user).unwrap();
    let decoded: User = codec.decode_new(&doc).unwrap();
    assert_eq!(decoded.password_hash, vec![0u8; 32]);
}

#[timeout(1000)]
#[test]
fn test_schema_of_other_table_rejected() {
    let registry = registry();
    let schema = registry.get("everything").unwrap();
    let mut user = sample_user();

    let err = erase_with_schema(&schema, &mut user).unwrap_err();
    assert!(matches!(err, CodecError::RecordTypeMismatch { .. }));
    assert_eq!(user.password_hash, vec![0xAB; 32]);
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::core::crypto::AesMode;
    use crate::core::errors::OptionBridgeError;
    use crate::core::session_db::SessionDb;

    const KEY: [u8; 32] = [0x42u8; 32];

    #[test]
    fn test_set_get_remove() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions"), AesMode::Cbc256).unwrap();
        db.set_key(&KEY).unwrap();

        assert_eq!(db.get("broker_x", "user@e").unwrap(), None);

        db.set("broker_x", "user@e", "cookie=abc").unwrap();
        assert_eq!(
            db.get("broker_x", "user@e").unwrap(),
            Some("cookie=abc".to_string())
        );

        // overwrite
        db.set("broker_x", "user@e", "cookie=def").unwrap();
        assert_eq!(
            db.get("broker_x", "user@e").unwrap(),
            Some("cookie=def".to_string())
        );

        db.remove("broker_x", "user@e").unwrap();
        assert_eq!(db.get("broker_x", "user@e").unwrap(), None);
    }

    #[test]
    fn test_round_trip_across_reopen() {
        // scenario S6: close and reopen the store with the same key
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions");
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();
            db.set("broker_x", "user@e", "cookie=abc").unwrap();
        }
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();
            assert_eq!(
                db.get("broker_x", "user@e").unwrap(),
                Some("cookie=abc".to_string())
            );
        }
    }

    #[test]
    fn test_key_length_mismatch() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions"), AesMode::Cbc256).unwrap();
        match db.set_key(&[0u8; 16]) {
            Err(OptionBridgeError::KeyLengthMismatch { expected, actual }) => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 16);
            }
            other => panic!("expected KeyLengthMismatch, got {:?}", other),
        }
        // CFB-128 wants a 16-byte key
        let db = SessionDb::open(dir.path().join("sessions_cfb"), AesMode::Cfb128).unwrap();
        assert!(db.set_key(&[0u8; 16]).is_ok());
    }

    #[test]
    fn test_corrupted_row_reports_decrypt_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions");
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();
            db.set("broker_x", "user@e", "cookie=abc").unwrap();
            db.set("broker_y", "other@e", "cookie=xyz").unwrap();
        }
        // flip one ciphertext byte behind the store's back
        {
            let raw = sled::open(&path).unwrap();
            let tree = raw.open_tree("sessions").unwrap();
            let (key, value) = tree.first().unwrap().unwrap();
            let mut corrupted = value.to_vec();
            let last = corrupted.len() - 1;
            corrupted[last] ^= 0xFF;
            tree.insert(key, corrupted).unwrap();
            raw.flush().unwrap();
        }
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();

            let first = db.get("broker_x", "user@e");
            let second = db.get("broker_y", "other@e");
            let (corrupted, intact) = if first.is_err() {
                (first, second)
            } else {
                (second, first)
            };
            assert!(matches!(
                corrupted,
                Err(OptionBridgeError::DecryptError(_))
            ));
            // corruption of one row must not poison the other
            assert!(intact.unwrap().is_some());
        }
    }

    #[test]
    fn test_clear_wipes_all_records() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions"), AesMode::Cbc256).unwrap();
        db.set_key(&KEY).unwrap();
        db.set("a", "1", "one").unwrap();
        db.set("b", "2", "two").unwrap();

        db.clear().unwrap();
        assert_eq!(db.get("a", "1").unwrap(), None);
        assert_eq!(db.get("b", "2").unwrap(), None);
    }

    #[test]
    fn test_lookup_key_is_stable_and_opaque() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions");
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();
            db.set("broker_x", "user@e", "first").unwrap();
            db.set("broker_x", "user@e", "second").unwrap();
        }
        let raw = sled::open(&path).unwrap();
        let tree = raw.open_tree("sessions").unwrap();
        // overwriting hit the same stored key, so exactly one row exists
        assert_eq!(tree.len(), 1);
        // and the stored key does not leak the platform or account
        let (key, _value) = tree.first().unwrap().unwrap();
        let key_bytes = key.to_vec();
        assert!(!String::from_utf8_lossy(&key_bytes).contains("broker_x"));
        assert!(!String::from_utf8_lossy(&key_bytes).contains("user@e"));
    }

    #[test]
    fn test_value_ivs_differ_between_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sessions");
        let read_value = |path: &std::path::Path| -> Vec<u8> {
            let raw = sled::open(path).unwrap();
            let tree = raw.open_tree("sessions").unwrap();
            let (_key, value) = tree.first().unwrap().unwrap();
            value.to_vec()
        };
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();
            db.set("broker_x", "user@e", "same payload").unwrap();
        }
        let first = read_value(&path);
        {
            let db = SessionDb::open(&path, AesMode::Cbc256).unwrap();
            db.set_key(&KEY).unwrap();
            db.set("broker_x", "user@e", "same payload").unwrap();
        }
        let second = read_value(&path);
        assert_ne!(first, second);
    }

    #[test]
    fn test_cfb_mode_round_trip() {
        let dir = tempdir().unwrap();
        let db = SessionDb::open(dir.path().join("sessions"), AesMode::Cfb256).unwrap();
        db.set_key(&KEY).unwrap();
        db.set("broker_x", "user@e", "cookie=cfb").unwrap();
        assert_eq!(
            db.get("broker_x", "user@e").unwrap(),
            Some("cookie=cfb".to_string())
        );
    }
}

#[cfg(test)]
mod tests {
    use crate::core::crypto::{
        decrypt, derive_iv, encrypt, encrypt_with_iv, AesMode, SecureKey, BLOCK_SIZE,
    };
    use crate::core::errors::OptionBridgeError;

    const MODES: [AesMode; 6] = [
        AesMode::Cbc128,
        AesMode::Cbc192,
        AesMode::Cbc256,
        AesMode::Cfb128,
        AesMode::Cfb192,
        AesMode::Cfb256,
    ];

    fn key_for(mode: AesMode) -> Vec<u8> {
        vec![0x42u8; mode.key_len()]
    }

    #[test]
    fn test_round_trip_all_modes() {
        let plain = b"session-cookie: value; token=abc123";
        for mode in MODES {
            let key = key_for(mode);
            let encrypted = encrypt(plain, &key, mode).unwrap();
            assert!(encrypted.len() > BLOCK_SIZE);
            let decrypted = decrypt(&encrypted, &key, mode).unwrap();
            assert_eq!(decrypted, plain, "round trip failed for {}", mode);
        }
    }

    #[test]
    fn test_round_trip_empty_message() {
        let key = key_for(AesMode::Cbc256);
        let encrypted = encrypt(b"", &key, AesMode::Cbc256).unwrap();
        let decrypted = decrypt(&encrypted, &key, AesMode::Cbc256).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_iv_freshness() {
        let key = key_for(AesMode::Cbc256);
        let first = encrypt(b"same message", &key, AesMode::Cbc256).unwrap();
        let second = encrypt(b"same message", &key, AesMode::Cbc256).unwrap();
        // a fresh random IV must change the whole ciphertext
        assert_ne!(first, second);
    }

    #[test]
    fn test_deterministic_iv_derivation() {
        let iv_a = derive_iv(b"platform:user@example.com");
        let iv_b = derive_iv(b"platform:user@example.com");
        let iv_c = derive_iv(b"platform:other@example.com");
        assert_eq!(iv_a, iv_b);
        assert_ne!(iv_a, iv_c);

        let key = key_for(AesMode::Cbc256);
        let first = encrypt_with_iv(b"lookup", &key, AesMode::Cbc256, &iv_a).unwrap();
        let second = encrypt_with_iv(b"lookup", &key, AesMode::Cbc256, &iv_b).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_key_length_mismatch() {
        let result = encrypt(b"data", &[0u8; 16], AesMode::Cbc256);
        match result {
            Err(OptionBridgeError::KeyLengthMismatch { expected, actual }) => {
                assert_eq!(expected, 32);
                assert_eq!(actual, 16);
            }
            other => panic!("expected KeyLengthMismatch, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_truncated_ciphertext() {
        let key = key_for(AesMode::Cbc256);
        let result = decrypt(&[0u8; BLOCK_SIZE - 1], &key, AesMode::Cbc256);
        assert!(matches!(result, Err(OptionBridgeError::DecryptError(_))));
    }

    #[test]
    fn test_corrupted_ciphertext() {
        let key = key_for(AesMode::Cbc256);
        let mut encrypted = encrypt(b"some session payload", &key, AesMode::Cbc256).unwrap();
        let last = encrypted.len() - 1;
        encrypted[last] ^= 0xFF;
        let result = decrypt(&encrypted, &key, AesMode::Cbc256);
        assert!(matches!(result, Err(OptionBridgeError::DecryptError(_))));
    }

    #[test]
    fn test_mode_key_lengths() {
        assert_eq!(AesMode::Cbc128.key_len(), 16);
        assert_eq!(AesMode::Cbc192.key_len(), 24);
        assert_eq!(AesMode::Cbc256.key_len(), 32);
        assert_eq!(AesMode::Cfb128.key_len(), 16);
        assert_eq!(AesMode::Cfb192.key_len(), 24);
        assert_eq!(AesMode::Cfb256.key_len(), 32);
    }

    #[test]
    fn test_secure_key_round_trip() {
        let mut secure = SecureKey::new().unwrap();
        let key = [0xA5u8; 32];
        secure.set_key(&key);
        assert_eq!(secure.key_len(), 32);
        secure.with_key(|plain| {
            assert_eq!(plain, &key[..]);
        });

        // replacing the key changes what the closure sees
        let shorter = [0x11u8; 16];
        secure.set_key(&shorter);
        assert_eq!(secure.key_len(), 16);
        secure.with_key(|plain| {
            assert_eq!(plain, &shorter[..]);
        });
    }

    #[test]
    fn test_secure_key_usable_for_encryption() {
        let mut secure = SecureKey::new().unwrap();
        secure.set_key(&[0x42u8; 32]);
        let encrypted = secure
            .with_key(|key| encrypt(b"masked key", key, AesMode::Cbc256))
            .unwrap();
        let decrypted = secure
            .with_key(|key| decrypt(&encrypted, key, AesMode::Cbc256))
            .unwrap();
        assert_eq!(decrypted, b"masked key");
    }
}

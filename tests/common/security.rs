//! 標準セキュリティハンドラ (RC4, R2/R3) の復号。
//!
//! 出力検証用。Encrypt辞書とファイルIDだけから鍵を導出し、ライブラリの暗号化処理には依存しない。

use lopdf::{Dictionary, Document, Object, ObjectId};

const PADDING: [u8; 32] = [
    0x28, 0xBF, 0x4E, 0x5E, 0x4E, 0x75, 0x8A, 0x41, 0x64, 0x00, 0x4E, 0x56, 0xFF, 0xFA, 0x01, 0x08,
    0x2E, 0x2E, 0x00, 0xB6, 0xD0, 0x68, 0x3E, 0x80, 0x2F, 0x0C, 0xA9, 0xFE, 0x64, 0x53, 0x69, 0x7A,
];

/// RC4。暗号化と復号は同じ操作。
pub fn rc4(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j: u8 = 0;
    for i in 0..256 {
        j = j.wrapping_add(s[i]).wrapping_add(key[i % key.len()]);
        s.swap(i, j as usize);
    }
    let (mut i, mut j) = (0u8, 0u8);
    data.iter()
        .map(|byte| {
            i = i.wrapping_add(1);
            j = j.wrapping_add(s[i as usize]);
            s.swap(i as usize, j as usize);
            byte ^ s[s[i as usize].wrapping_add(s[j as usize]) as usize]
        })
        .collect()
}

/// 認証済みの文書鍵
pub struct StandardSecurity {
    key: Vec<u8>,
}

impl StandardSecurity {
    /// オーナーパスワードで認証する。O値から復元したユーザーパスワードで鍵を得る。
    pub fn authenticate_owner(doc: &Document, password: &str) -> Option<Self> {
        let encrypt = encrypt_dict(doc)?;
        let revision = encrypt.get(b"R").and_then(Object::as_i64).ok()?;
        let length = encrypt
            .get(b"Length")
            .and_then(Object::as_i64)
            .unwrap_or(40);
        let owner = encrypt.get(b"O").and_then(Object::as_str).ok()?;
        let key_len = if revision >= 3 {
            (length / 8) as usize
        } else {
            5
        };

        let mut digest = md5::compute(pad(password.as_bytes())).0.to_vec();
        if revision >= 3 {
            for _ in 0..50 {
                digest = md5::compute(&digest).0.to_vec();
            }
        }
        let key = &digest[..key_len];

        let mut user = owner.to_vec();
        if revision >= 3 {
            for round in (0..=19u8).rev() {
                let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
                user = rc4(&round_key, &user);
            }
        } else {
            user = rc4(key, &user);
        }
        Self::authenticate_padded(doc, &user)
    }

    /// ユーザーパスワードで認証する。一致しなければ `None`。
    pub fn authenticate(doc: &Document, password: &str) -> Option<Self> {
        Self::authenticate_padded(doc, &pad(password.as_bytes()))
    }

    fn authenticate_padded(doc: &Document, padded: &[u8]) -> Option<Self> {
        let encrypt = encrypt_dict(doc)?;
        let revision = encrypt.get(b"R").and_then(Object::as_i64).ok()?;
        let length = encrypt
            .get(b"Length")
            .and_then(Object::as_i64)
            .unwrap_or(40);
        let owner = encrypt.get(b"O").and_then(Object::as_str).ok()?;
        let user = encrypt.get(b"U").and_then(Object::as_str).ok()?;
        let permissions = encrypt.get(b"P").and_then(Object::as_i64).ok()? as i32;
        let file_id = doc
            .trailer
            .get(b"ID")
            .and_then(Object::as_array)
            .ok()?
            .first()?
            .as_str()
            .ok()?;

        let key_len = if revision >= 3 {
            (length / 8) as usize
        } else {
            5
        };

        let mut context = md5::Context::new();
        context.consume(padded);
        context.consume(owner);
        context.consume(permissions.to_le_bytes());
        context.consume(file_id);
        let mut digest = context.finalize().0.to_vec();
        if revision >= 3 {
            for _ in 0..50 {
                digest = md5::compute(&digest[..key_len]).0.to_vec();
            }
        }
        let key = digest[..key_len].to_vec();

        let matches = if revision >= 3 {
            let mut context = md5::Context::new();
            context.consume(PADDING);
            context.consume(file_id);
            let mut check = rc4(&key, &context.finalize().0);
            for round in 1..=19u8 {
                let round_key: Vec<u8> = key.iter().map(|b| b ^ round).collect();
                check = rc4(&round_key, &check);
            }
            user.len() >= 16 && check[..16] == user[..16]
        } else {
            rc4(&key, &PADDING) == user
        };
        matches.then_some(Self { key })
    }

    /// オブジェクト単位の鍵で復号する。
    pub fn decrypt(&self, id: ObjectId, data: &[u8]) -> Vec<u8> {
        let mut salted = self.key.clone();
        salted.extend_from_slice(&id.0.to_le_bytes()[..3]);
        salted.extend_from_slice(&id.1.to_le_bytes()[..2]);
        let digest = md5::compute(&salted);
        let len = (self.key.len() + 5).min(16);
        rc4(&digest.0[..len], data)
    }
}

fn pad(password: &[u8]) -> [u8; 32] {
    let mut padded = [0u8; 32];
    let n = password.len().min(32);
    padded[..n].copy_from_slice(&password[..n]);
    padded[n..].copy_from_slice(&PADDING[..32 - n]);
    padded
}

fn encrypt_dict(doc: &Document) -> Option<&Dictionary> {
    match doc.trailer.get(b"Encrypt").ok()? {
        Object::Reference(id) => doc.get_object(*id).and_then(Object::as_dict).ok(),
        Object::Dictionary(dict) => Some(dict),
        _ => None,
    }
}

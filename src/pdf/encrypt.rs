// 標準セキュリティハンドラ (RC4 128bit, V2/R3) による暗号化

use std::time::{SystemTime, UNIX_EPOCH};

use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Document, Object, StringFormat};

use crate::error::HocrPdfError;

/// 鍵長（ビット）
const KEY_BITS: usize = 128;

/// 文書IDを生成する。
pub fn generate_document_id(doc: &Document) -> Vec<u8> {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_nanos());
    let mut context = md5::Context::new();
    context.consume(nanos.to_le_bytes());
    context.consume((doc.objects.len() as u64).to_le_bytes());
    context.consume(doc.max_id.to_le_bytes());
    context.finalize().0.to_vec()
}

/// 文書IDをトレーラに設定し、全オブジェクトを暗号化する。
///
/// オーナーパスワードが無ければユーザーパスワードを使う。全権限を許可する。
pub fn encrypt_document(
    doc: &mut Document,
    user_password: &str,
    owner_password: Option<&str>,
) -> crate::error::Result<()> {
    let owner = owner_password
        .filter(|p| !p.is_empty())
        .unwrap_or(user_password);

    // 鍵の導出にIDの第1要素を使うので先に設定する
    let id = generate_document_id(doc);
    doc.trailer.set(
        "ID",
        vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ],
    );

    let version = EncryptionVersion::V2 {
        document: &*doc,
        owner_password: owner,
        user_password,
        key_length: KEY_BITS,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version)
        .map_err(|e| HocrPdfError::finalize(format!("encryption setup failed: {e}")))?;
    doc.encrypt(&state)
        .map_err(|e| HocrPdfError::finalize(format!("encryption failed: {e}")))?;

    tracing::debug!(objects = doc.objects.len(), "encrypted document");
    Ok(())
}

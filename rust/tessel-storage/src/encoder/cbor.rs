use crate::{Blake3Hash, TesselStorageError};

use super::Encoder;
use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use tessel_common::ConditionalSync;

/// A basic [`Encoder`] implementation that encodes data as IPLD-compatible
/// CBOR and names the resulting bytes by their BLAKE3 hash. DAG-CBOR is a
/// canonical encoding, so equal chunks always produce equal hashes.
#[derive(Clone, Debug, Default)]
pub struct CborEncoder;

#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
impl Encoder for CborEncoder {
    type Bytes = Vec<u8>;
    type Hash = Blake3Hash;
    type Error = TesselStorageError;

    async fn encode<T>(&self, chunk: &T) -> Result<(Self::Hash, Self::Bytes), Self::Error>
    where
        T: Serialize + ConditionalSync,
    {
        let bytes = serde_ipld_dagcbor::to_vec(chunk)
            .map_err(|error| TesselStorageError::EncodeFailed(format!("{error}")))?;
        let hash = blake3::hash(&bytes).into();

        Ok((hash, bytes))
    }

    async fn decode<T>(&self, bytes: &[u8]) -> Result<T, Self::Error>
    where
        T: DeserializeOwned + ConditionalSync,
    {
        serde_ipld_dagcbor::from_slice::<T>(bytes)
            .map_err(|error| TesselStorageError::DecodeFailed(format!("{error}")))
    }
}

#[cfg(test)]
mod tests {
    use super::{CborEncoder, Encoder};
    use anyhow::Result;
    use serde::{Deserialize, Serialize};

    #[cfg(target_arch = "wasm32")]
    use wasm_bindgen_test::wasm_bindgen_test;

    #[derive(PartialEq, Debug, Serialize, Deserialize)]
    struct TestChunk {
        keys: Vec<u64>,
        label: String,
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_names_equal_chunks_with_equal_hashes() -> Result<()> {
        let encoder = CborEncoder;
        let chunk = TestChunk {
            keys: vec![1, 5, 9],
            label: "leaf".into(),
        };

        let (first_hash, first_bytes) = encoder.encode(&chunk).await?;
        let (second_hash, _) = encoder
            .encode(&TestChunk {
                keys: vec![1, 5, 9],
                label: "leaf".into(),
            })
            .await?;
        let (other_hash, _) = encoder
            .encode(&TestChunk {
                keys: vec![1, 5],
                label: "leaf".into(),
            })
            .await?;

        assert_eq!(first_hash, second_hash);
        assert_eq!(encoder.hash(&chunk).await?, first_hash);
        assert_ne!(first_hash, other_hash);
        assert_eq!(encoder.decode::<TestChunk>(&first_bytes).await?, chunk);

        Ok(())
    }

    #[cfg_attr(target_arch = "wasm32", wasm_bindgen_test)]
    #[cfg_attr(not(target_arch = "wasm32"), tokio::test)]
    async fn it_fails_to_decode_garbage() -> Result<()> {
        let result = CborEncoder.decode::<TestChunk>(&[0xff, 0x00, 0x13]).await;
        assert!(result.is_err());
        Ok(())
    }
}

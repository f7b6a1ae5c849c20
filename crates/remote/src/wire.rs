//! Fixed-layout little-endian wire records exchanged between the
//! broker-side listener and the service-side connector. No length
//! prefix: each side reads exactly `sizeof(record)` bytes per
//! transaction.

use tb_domain::{Feature, Pid, Uid};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// `app_uid: u32, app_pid: i32, feature: u64, app_start_time: i64`.
pub const REQUEST_RECORD_LEN: usize = 4 + 4 + 8 + 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestRecord {
    pub app_uid: Uid,
    pub app_pid: Pid,
    pub feature: Feature,
    pub app_start_time: i64,
}

impl RequestRecord {
    pub fn to_bytes(self) -> [u8; REQUEST_RECORD_LEN] {
        let mut buf = [0u8; REQUEST_RECORD_LEN];
        buf[0..4].copy_from_slice(&self.app_uid.get().to_le_bytes());
        buf[4..8].copy_from_slice(&self.app_pid.get().to_le_bytes());
        buf[8..16].copy_from_slice(&self.feature.get().to_le_bytes());
        buf[16..24].copy_from_slice(&self.app_start_time.to_le_bytes());
        buf
    }

    pub fn from_bytes(buf: &[u8; REQUEST_RECORD_LEN]) -> Self {
        Self {
            app_uid: Uid::new(u32::from_le_bytes(buf[0..4].try_into().unwrap())),
            app_pid: Pid::new(i32::from_le_bytes(buf[4..8].try_into().unwrap())),
            feature: Feature::new(u64::from_le_bytes(buf[8..16].try_into().unwrap())),
            app_start_time: i64::from_le_bytes(buf[16..24].try_into().unwrap()),
        }
    }

    pub async fn read_from(
        stream: &mut (impl tokio::io::AsyncRead + Unpin),
    ) -> std::io::Result<Self> {
        let mut buf = [0u8; REQUEST_RECORD_LEN];
        stream.read_exact(&mut buf).await?;
        Ok(Self::from_bytes(&buf))
    }

    pub async fn write_to(
        self,
        stream: &mut (impl tokio::io::AsyncWrite + Unpin),
    ) -> std::io::Result<()> {
        stream.write_all(&self.to_bytes()).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnswerRecord(pub u8);

impl AnswerRecord {
    pub fn from_answer(answer: tb_domain::Answer) -> Self {
        Self(answer.as_db_int() as u8)
    }

    pub fn to_answer(self) -> Option<tb_domain::Answer> {
        tb_domain::Answer::from_db_int(self.0 as i64)
    }

    pub async fn read_from(
        stream: &mut (impl tokio::io::AsyncRead + Unpin),
    ) -> std::io::Result<Self> {
        let mut buf = [0u8; 1];
        stream.read_exact(&mut buf).await?;
        Ok(Self(buf[0]))
    }

    pub async fn write_to(
        self,
        stream: &mut (impl tokio::io::AsyncWrite + Unpin),
    ) -> std::io::Result<()> {
        stream.write_all(&[self.0]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_record_round_trips_through_bytes() {
        let record = RequestRecord {
            app_uid: Uid::new(1000),
            app_pid: Pid::new(-42),
            feature: Feature::new(7),
            app_start_time: 123_456_789,
        };
        let bytes = record.to_bytes();
        assert_eq!(RequestRecord::from_bytes(&bytes), record);
    }

    #[test]
    fn answer_record_maps_to_domain_answer() {
        assert_eq!(
            AnswerRecord::from_answer(tb_domain::Answer::Granted).to_answer(),
            Some(tb_domain::Answer::Granted)
        );
        assert_eq!(
            AnswerRecord::from_answer(tb_domain::Answer::Denied).to_answer(),
            Some(tb_domain::Answer::Denied)
        );
    }
}

//! Local connection candidate gathering sessions

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Live candidate gathering; the producer is torn down when the session drops
#[derive(Debug)]
pub struct CandidateSession {
    receiver: mpsc::Receiver<String>,
    producer: Option<JoinHandle<()>>,
}

impl CandidateSession {
    /// Session fed by a background producer task
    pub fn new(receiver: mpsc::Receiver<String>, producer: JoinHandle<()>) -> Self {
        Self {
            receiver,
            producer: Some(producer),
        }
    }

    /// Session over an externally owned channel
    pub fn from_receiver(receiver: mpsc::Receiver<String>) -> Self {
        Self {
            receiver,
            producer: None,
        }
    }

    /// Next candidate line, `None` once gathering has finished
    pub async fn next_candidate(&mut self) -> Option<String> {
        self.receiver.recv().await
    }

    pub fn close(&mut self) {
        self.receiver.close();
        if let Some(producer) = self.producer.take() {
            producer.abort();
        }
    }
}

impl Drop for CandidateSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_session_yields_candidates_in_order() {
        let (tx, rx) = mpsc::channel(4);
        let mut session = CandidateSession::from_receiver(rx);
        tx.send("candidate:1 1 udp 2122260223 192.168.1.20 54321 typ host".to_string()).await.unwrap();
        tx.send("candidate:2".to_string()).await.unwrap();
        drop(tx);

        assert!(session.next_candidate().await.unwrap().contains("192.168.1.20"));
        assert_eq!(session.next_candidate().await.as_deref(), Some("candidate:2"));
        assert_eq!(session.next_candidate().await, None);
    }

    #[tokio::test]
    async fn test_drop_aborts_producer() {
        let (_tx, rx) = mpsc::channel::<String>(1);
        let marker = std::sync::Arc::new(());
        let held = marker.clone();
        let producer = tokio::spawn(async move {
            let _held = held;
            tokio::time::sleep(Duration::from_secs(3600)).await;
        });
        let session = CandidateSession::new(rx, producer);
        drop(session);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(std::sync::Arc::strong_count(&marker), 1);
    }
}

use anyhow::{Result, bail};
use async_trait::async_trait;
use huddle_client::{
    LinkEvent, LinkId, LocalTrack, PeerConnection, PeerTransport, SdpKind, SessionDescription,
    TrackId, TrackKind,
};
use huddle_core::{IceCandidate, ParticipantId};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Phase {
    #[default]
    Stable,
    HaveLocalOffer,
    HaveRemoteOffer,
}

/// Everything one fake connection was asked to do.
#[derive(Debug, Clone, Default)]
pub struct LinkRecord {
    pub remote: ParticipantId,
    pub link: LinkId,
    pub offers_created: usize,
    pub answers_created: usize,
    pub local_descriptions: Vec<SdpKind>,
    pub remote_descriptions: Vec<SdpKind>,
    /// Candidates actually applied, in order.
    pub candidates: Vec<IceCandidate>,
    pub audio: Option<TrackId>,
    pub video: Option<TrackId>,
    pub replacements: usize,
    pub closed: bool,
    phase: Phase,
    has_remote: bool,
    gathered: bool,
}

impl LinkRecord {
    /// Offers this side sent that the other side answered.
    pub fn honored_offers(&self) -> usize {
        self.remote_descriptions
            .iter()
            .filter(|k| **k == SdpKind::Answer)
            .count()
    }
}

/// Deterministic in-memory [`PeerTransport`]: SDP strings name their author,
/// one host candidate is "gathered" per link, and a link reports `Connected`
/// as soon as both descriptions are in place.
#[derive(Clone)]
pub struct FakeTransport {
    owner: ParticipantId,
    links: Arc<Mutex<Vec<Arc<Mutex<LinkRecord>>>>>,
    fail_connect: Arc<AtomicBool>,
}

impl FakeTransport {
    pub fn new(owner: impl Into<ParticipantId>) -> Self {
        Self {
            owner: owner.into(),
            links: Arc::new(Mutex::new(Vec::new())),
            fail_connect: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn fail_connect(&self, fail: bool) {
        self.fail_connect.store(fail, Ordering::SeqCst);
    }

    pub fn connect_count(&self) -> usize {
        self.links.lock().unwrap().len()
    }

    /// Every connection ever opened to `remote`, oldest first.
    pub fn records_for(&self, remote: &str) -> Vec<LinkRecord> {
        self.links
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.lock().unwrap().clone())
            .filter(|r| r.remote.as_str() == remote)
            .collect()
    }

    pub fn latest(&self, remote: &str) -> Option<LinkRecord> {
        self.records_for(remote).pop()
    }

    pub fn total_offers(&self) -> usize {
        self.links
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.lock().unwrap().offers_created)
            .sum()
    }

    pub fn open_count(&self) -> usize {
        self.links
            .lock()
            .unwrap()
            .iter()
            .filter(|r| !r.lock().unwrap().closed)
            .count()
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    async fn connect(
        &self,
        remote: &ParticipantId,
        link: LinkId,
        events: mpsc::UnboundedSender<LinkEvent>,
    ) -> Result<Box<dyn PeerConnection>> {
        if self.fail_connect.load(Ordering::SeqCst) {
            bail!("no network");
        }

        let record = Arc::new(Mutex::new(LinkRecord {
            remote: remote.clone(),
            link,
            ..Default::default()
        }));
        self.links.lock().unwrap().push(record.clone());

        Ok(Box::new(FakeConnection {
            owner: self.owner.clone(),
            remote: remote.clone(),
            link,
            record,
            events,
        }))
    }
}

struct FakeConnection {
    owner: ParticipantId,
    remote: ParticipantId,
    link: LinkId,
    record: Arc<Mutex<LinkRecord>>,
    events: mpsc::UnboundedSender<LinkEvent>,
}

impl FakeConnection {
    fn host_candidate(&self) -> IceCandidate {
        IceCandidate {
            candidate: format!(
                "candidate:1 1 udp 2130706431 10.0.0.1 50000 typ host ufrag {}",
                self.owner
            ),
            sdp_mid: Some("0".to_owned()),
            sdp_m_line_index: Some(0),
        }
    }
}

#[async_trait]
impl PeerConnection for FakeConnection {
    async fn create_offer(&self) -> Result<String> {
        let mut record = self.record.lock().unwrap();
        record.offers_created += 1;
        Ok(format!(
            "offer {} -> {} #{}",
            self.owner, self.remote, record.offers_created
        ))
    }

    async fn create_answer(&self) -> Result<String> {
        let mut record = self.record.lock().unwrap();
        if record.phase != Phase::HaveRemoteOffer {
            bail!("create_answer without a remote offer");
        }
        record.answers_created += 1;
        Ok(format!(
            "answer {} -> {} #{}",
            self.owner, self.remote, record.answers_created
        ))
    }

    async fn set_local_description(&self, desc: SessionDescription) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        let connected = match desc.kind {
            SdpKind::Offer => {
                if record.phase == Phase::HaveRemoteOffer {
                    bail!("local offer while holding a remote offer");
                }
                record.phase = Phase::HaveLocalOffer;
                false
            }
            SdpKind::Answer => {
                if record.phase != Phase::HaveRemoteOffer {
                    bail!("local answer without a remote offer");
                }
                record.phase = Phase::Stable;
                true
            }
            SdpKind::Rollback => {
                if record.phase != Phase::HaveLocalOffer {
                    bail!("nothing to roll back");
                }
                record.phase = Phase::Stable;
                false
            }
        };
        record.local_descriptions.push(desc.kind);

        if desc.kind != SdpKind::Rollback && !record.gathered {
            record.gathered = true;
            let _ = self.events.send(LinkEvent::CandidateGathered {
                remote: self.remote.clone(),
                link: self.link,
                candidate: self.host_candidate(),
            });
        }
        if connected {
            let _ = self.events.send(LinkEvent::Connected {
                remote: self.remote.clone(),
                link: self.link,
            });
        }
        Ok(())
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        let connected = match desc.kind {
            SdpKind::Offer => {
                if record.phase == Phase::HaveLocalOffer {
                    bail!("remote offer in have-local-offer");
                }
                record.phase = Phase::HaveRemoteOffer;
                false
            }
            SdpKind::Answer => {
                if record.phase != Phase::HaveLocalOffer {
                    bail!("remote answer without a local offer");
                }
                record.phase = Phase::Stable;
                true
            }
            SdpKind::Rollback => bail!("remote rollback is not a thing"),
        };
        record.remote_descriptions.push(desc.kind);
        record.has_remote = true;

        if connected {
            let _ = self.events.send(LinkEvent::Connected {
                remote: self.remote.clone(),
                link: self.link,
            });
        }
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        if !record.has_remote {
            bail!("candidate before remote description");
        }
        record.candidates.push(candidate);
        Ok(())
    }

    async fn replace_track(&self, kind: TrackKind, track: Option<LocalTrack>) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        let id = track.map(|t| t.id().clone());
        match kind {
            TrackKind::Audio => record.audio = id,
            TrackKind::Video => record.video = id,
        }
        record.replacements += 1;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        let mut record = self.record.lock().unwrap();
        record.closed = true;
        record.audio = None;
        record.video = None;
        Ok(())
    }
}

//! Thread-per-rank transport.
//!
//! [`LocalCluster`] launches `P` ranks as named threads in one process and
//! wires every ordered pair with a zero-capacity channel, so each send blocks
//! until the matching receive is posted. A rank that returns or panics drops
//! its channel ends, and any peer still waiting on it observes
//! [`CommError::Disconnected`] instead of blocking forever.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use crate::group::ProcessGroup;
use crate::message::{Payload, PhaseTag};
use crate::CommError;

/// A payload in flight, labelled with its phase.
#[derive(Debug)]
pub(crate) struct Envelope {
    pub tag: PhaseTag,
    pub payload: Payload,
}

/// One rank's view of the wiring. Its own slots are empty.
#[derive(Debug)]
pub(crate) struct Endpoint {
    world_rank: usize,
    outboxes: Vec<Option<SyncSender<Envelope>>>,
    inboxes: Vec<Option<Receiver<Envelope>>>,
}

impl Endpoint {
    pub(crate) fn world_rank(&self) -> usize {
        self.world_rank
    }

    pub(crate) fn world_size(&self) -> usize {
        self.outboxes.len()
    }

    /// Blocking send to world rank `dest`.
    pub(crate) fn post(&self, dest: usize, envelope: Envelope) -> Result<(), CommError> {
        let tag = envelope.tag;
        let outbox = self
            .outboxes
            .get(dest)
            .ok_or(CommError::InvalidRank {
                rank: dest,
                size: self.world_size(),
            })?
            .as_ref()
            .ok_or(CommError::SelfMessage(dest))?;
        outbox
            .send(envelope)
            .map_err(|_| CommError::Disconnected { peer: dest, tag })
    }

    /// Blocking receive of the next message from world rank `source`.
    pub(crate) fn collect(&self, source: usize, tag: PhaseTag) -> Result<Envelope, CommError> {
        let inbox = self
            .inboxes
            .get(source)
            .ok_or(CommError::InvalidRank {
                rank: source,
                size: self.world_size(),
            })?
            .as_ref()
            .ok_or(CommError::SelfMessage(source))?;
        inbox
            .recv()
            .map_err(|_| CommError::Disconnected { peer: source, tag })
    }
}

/// Launches a fixed number of ranks that run the same function.
#[derive(Debug, Clone, Copy)]
pub struct LocalCluster {
    size: usize,
}

impl LocalCluster {
    pub fn new(size: usize) -> Result<Self, CommError> {
        if size == 0 {
            return Err(CommError::EmptyCluster);
        }
        Ok(Self { size })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Run `rank_main` on every rank and collect the results in rank order.
    ///
    /// Each rank receives the world group. The call returns once every rank
    /// has finished; a panicking rank is reported as
    /// [`CommError::RankPanicked`].
    pub fn run<T, F>(&self, rank_main: F) -> Result<Vec<T>, CommError>
    where
        F: Fn(ProcessGroup) -> T + Sync,
        T: Send,
    {
        let endpoints = self.wire();
        log::debug!("Launching {} ranks", self.size);

        thread::scope(|scope| {
            let rank_main = &rank_main;
            let handles = endpoints
                .into_iter()
                .map(|endpoint| {
                    thread::Builder::new()
                        .name(format!("rank-{}", endpoint.world_rank))
                        .spawn_scoped(scope, move || rank_main(ProcessGroup::world(endpoint)))
                })
                .collect::<Result<Vec<_>, _>>()?;

            let mut results = Vec::with_capacity(handles.len());
            let mut panicked = None;
            for (rank, handle) in handles.into_iter().enumerate() {
                match handle.join() {
                    Ok(value) => results.push(value),
                    Err(_) => {
                        log::error!("Rank {} panicked", rank);
                        panicked.get_or_insert(rank);
                    }
                }
            }

            match panicked {
                Some(rank) => Err(CommError::RankPanicked(rank)),
                None => Ok(results),
            }
        })
    }

    fn wire(&self) -> Vec<Endpoint> {
        let p = self.size;
        let mut outboxes: Vec<Vec<Option<SyncSender<Envelope>>>> =
            (0..p).map(|_| (0..p).map(|_| None).collect()).collect();
        let mut inboxes: Vec<Vec<Option<Receiver<Envelope>>>> =
            (0..p).map(|_| (0..p).map(|_| None).collect()).collect();

        for source in 0..p {
            for dest in (0..p).filter(|&d| d != source) {
                let (tx, rx) = mpsc::sync_channel(0);
                outboxes[source][dest] = Some(tx);
                inboxes[dest][source] = Some(rx);
            }
        }

        outboxes
            .into_iter()
            .zip(inboxes)
            .enumerate()
            .map(|(world_rank, (outboxes, inboxes))| Endpoint {
                world_rank,
                outboxes,
                inboxes,
            })
            .collect()
    }
}

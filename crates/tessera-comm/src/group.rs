//! Process groups and the collectives built on point-to-point messages.

use std::rc::Rc;

use crate::cluster::{Endpoint, Envelope};
use crate::message::{Message, Payload, PhaseTag};
use crate::CommError;

/// An ordered subset of the world's ranks, seen from one member.
///
/// Ranks inside a group are dense `0..size` and follow the member order;
/// every operation addresses peers by group rank. Groups are cheap to clone
/// and share the owning rank's channels.
///
/// Collectives are built from blocking point-to-point transfers, so every
/// member of the group must make the same sequence of collective calls.
#[derive(Debug, Clone)]
pub struct ProcessGroup {
    endpoint: Rc<Endpoint>,
    members: Rc<[usize]>,
    rank: usize,
}

impl ProcessGroup {
    /// The group of all ranks.
    pub(crate) fn world(endpoint: Endpoint) -> Self {
        let members = (0..endpoint.world_size()).collect();
        let rank = endpoint.world_rank();
        Self {
            endpoint: Rc::new(endpoint),
            members,
            rank,
        }
    }

    /// This member's rank within the group.
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.members.len()
    }

    pub fn is_root(&self) -> bool {
        self.rank == 0
    }

    /// This member's rank in the world group.
    pub fn world_rank(&self) -> usize {
        self.endpoint.world_rank()
    }

    /// World ranks of the members, in group order.
    pub fn members(&self) -> &[usize] {
        &self.members
    }

    fn world_of(&self, rank: usize) -> Result<usize, CommError> {
        self.members
            .get(rank)
            .copied()
            .ok_or(CommError::InvalidRank {
                rank,
                size: self.size(),
            })
    }

    fn peer(&self, rank: usize) -> Result<usize, CommError> {
        let world = self.world_of(rank)?;
        if rank == self.rank {
            return Err(CommError::SelfMessage(world));
        }
        Ok(world)
    }

    /// Send `value` to group rank `dest`, blocking until it is received.
    pub fn send<T: Message>(&self, value: T, dest: usize, tag: PhaseTag) -> Result<(), CommError> {
        let peer = self.peer(dest)?;
        self.endpoint.post(
            peer,
            Envelope {
                tag,
                payload: value.into_payload(),
            },
        )
    }

    /// Receive the next message from group rank `source`.
    ///
    /// An abort notice from the peer surfaces as [`CommError::Aborted`]; a
    /// message from another phase or of another type is an error.
    pub fn receive<T: Message>(&self, source: usize, tag: PhaseTag) -> Result<T, CommError> {
        let peer = self.peer(source)?;
        let envelope = self.endpoint.collect(peer, tag)?;

        if let Payload::Abort(reason) = envelope.payload {
            return Err(CommError::Aborted { peer, reason });
        }
        if envelope.tag != tag {
            return Err(CommError::PhaseMismatch {
                peer,
                expected: tag,
                found: envelope.tag,
            });
        }

        let found = envelope.payload.kind();
        T::from_payload(envelope.payload).ok_or(CommError::UnexpectedPayload {
            peer,
            expected: T::KIND,
            found,
        })
    }

    /// Distribute the root's value to every member.
    ///
    /// The root passes `Some(value)`; other members pass `None` and receive
    /// a copy. Every member returns the value.
    pub fn broadcast<T: Message + Clone>(
        &self,
        value: Option<T>,
        root: usize,
        tag: PhaseTag,
    ) -> Result<T, CommError> {
        self.world_of(root)?;
        if self.rank != root {
            return self.receive(root, tag);
        }

        let value = value.ok_or(CommError::MissingBroadcastValue(root))?;
        for dest in (0..self.size()).filter(|&r| r != root) {
            self.send(value.clone(), dest, tag)?;
        }
        Ok(value)
    }

    /// Broadcast a [`Header`](crate::Header) describing the value, then the
    /// value itself, and check on arrival that the two agree.
    pub fn broadcast_framed<T: Message + Clone>(
        &self,
        value: Option<T>,
        root: usize,
        tag: PhaseTag,
    ) -> Result<T, CommError> {
        let header = self.broadcast(value.as_ref().map(Message::header), root, tag)?;
        let value = self.broadcast(value, root, tag)?;
        if value.header() != header {
            return Err(CommError::FrameMismatch {
                peer: self.world_of(root)?,
            });
        }
        Ok(value)
    }

    /// Collect one value from every member at `root`, in group rank order.
    ///
    /// Returns `Some` at the root and `None` elsewhere.
    pub fn gather<T: Message>(
        &self,
        value: T,
        root: usize,
        tag: PhaseTag,
    ) -> Result<Option<Vec<T>>, CommError> {
        self.world_of(root)?;
        if self.rank != root {
            self.send(value, root, tag)?;
            return Ok(None);
        }

        let mut values = Vec::with_capacity(self.size());
        for source in (0..self.size()).filter(|&r| r != root) {
            values.push(self.receive(source, tag)?);
        }
        values.insert(root, value);
        Ok(Some(values))
    }

    /// Partition the group by `key`.
    ///
    /// Members passing the same key form a subgroup that keeps their relative
    /// order in this group. Every member must call `split`.
    pub fn split(&self, key: usize) -> Result<ProcessGroup, CommError> {
        let keys = self.gather(key, 0, PhaseTag::Split)?;
        let keys: Vec<usize> = self.broadcast(keys, 0, PhaseTag::Split)?;

        let members: Rc<[usize]> = keys
            .iter()
            .zip(self.members.iter())
            .filter(|&(&k, _)| k == key)
            .map(|(_, &world)| world)
            .collect();
        let rank = keys[..self.rank].iter().filter(|&&k| k == key).count();

        log::trace!(
            "Rank {} joined group {:?} as rank {} (key {})",
            self.world_rank(),
            members,
            rank,
            key
        );

        Ok(ProcessGroup {
            endpoint: Rc::clone(&self.endpoint),
            members,
            rank,
        })
    }

    /// Tell every other member that the run is abandoned.
    ///
    /// Peers blocked in a receive from this member fail with
    /// [`CommError::Aborted`] carrying `reason`. Used by the root when it
    /// cannot supply the value others are waiting for.
    pub fn abort(&self, reason: &str, tag: PhaseTag) -> Result<(), CommError> {
        log::warn!("Rank {} aborting during {}: {}", self.world_rank(), tag, reason);
        for dest in (0..self.size()).filter(|&r| r != self.rank) {
            let peer = self.peer(dest)?;
            self.endpoint.post(
                peer,
                Envelope {
                    tag,
                    payload: Payload::Abort(reason.to_owned()),
                },
            )?;
        }
        Ok(())
    }
}

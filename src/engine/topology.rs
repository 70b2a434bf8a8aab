// src/engine/topology.rs
//
// Message-passing topology for ranks that share no memory.
//
// Ranks form a star around the coordinator (rank 0): the coordinator holds a
// link to every worker, each worker holds a link back to the coordinator
// only. Every payload crosses a channel by value, so a rank only ever touches
// memory it owns.
//
// Collectives run in a fixed order (broadcast, scatter, gather). Each
// message carries its phase; receiving a message from the wrong phase is a
// transport failure, never silently reordered.

use crate::error::RowGrayError;
use std::sync::mpsc::{self, Receiver, Sender};

type TopologyResult<T> = std::result::Result<T, RowGrayError>;

/// Rank that owns the full buffers and roots every collective.
pub const COORDINATOR: usize = 0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Broadcast,
    Scatter,
    Gather,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Broadcast => "broadcast",
            Phase::Scatter => "scatter",
            Phase::Gather => "gather",
        }
    }
}

#[derive(Debug)]
enum Payload<H> {
    Header(H),
    Rows(Vec<u8>),
}

#[derive(Debug)]
struct Envelope<H> {
    from: usize,
    phase: Phase,
    payload: Payload<H>,
}

/// One rank's view of the topology. Moved into the thread that plays the rank.
#[derive(Debug)]
pub struct Endpoint<H> {
    rank: usize,
    size: usize,
    inbox: Receiver<Envelope<H>>,
    links: Vec<Option<Sender<Envelope<H>>>>,
}

/// Build `size` connected endpoints, indexed by rank.
pub fn star<H: Send>(size: usize) -> Vec<Endpoint<H>> {
    let (senders, inboxes): (Vec<_>, Vec<_>) = (0..size).map(|_| mpsc::channel()).unzip();

    inboxes
        .into_iter()
        .enumerate()
        .map(|(rank, inbox)| {
            let links = (0..size)
                .map(|peer| {
                    let linked = if rank == COORDINATOR {
                        peer != COORDINATOR
                    } else {
                        peer == COORDINATOR
                    };
                    linked.then(|| senders[peer].clone())
                })
                .collect();
            Endpoint {
                rank,
                size,
                inbox,
                links,
            }
        })
        .collect()
}

impl<H: Clone + Send> Endpoint<H> {
    pub fn rank(&self) -> usize {
        self.rank
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn is_coordinator(&self) -> bool {
        self.rank == COORDINATOR
    }

    /// Coordinator passes `Some(value)`; every other rank passes `None` and
    /// receives the coordinator's value.
    pub fn broadcast(&self, value: Option<H>) -> TopologyResult<H> {
        if self.is_coordinator() {
            let value = value.ok_or_else(|| {
                RowGrayError::invalid_argument(
                    "broadcast",
                    "None",
                    "coordinator must supply a value",
                )
            })?;
            for peer in self.workers() {
                self.send(peer, Phase::Broadcast, Payload::Header(value.clone()))?;
            }
            Ok(value)
        } else {
            match self.recv(Phase::Broadcast)?.payload {
                Payload::Header(value) => Ok(value),
                Payload::Rows(_) => Err(self.unexpected(Phase::Broadcast, "rows")),
            }
        }
    }

    /// Coordinator passes one owned chunk per rank (index = rank) and keeps
    /// chunk 0; every other rank receives exactly its own chunk.
    pub fn scatter(&self, chunks: Option<Vec<Vec<u8>>>) -> TopologyResult<Vec<u8>> {
        if self.is_coordinator() {
            let chunks = chunks.ok_or_else(|| {
                RowGrayError::invalid_argument("scatter", "None", "coordinator must supply chunks")
            })?;
            if chunks.len() != self.size {
                return Err(RowGrayError::invalid_argument(
                    "scatter",
                    chunks.len().to_string(),
                    format!("expected one chunk per rank ({})", self.size),
                ));
            }
            let mut chunks = chunks.into_iter();
            let own = chunks.next().unwrap_or_default();
            for (peer, chunk) in (1..self.size).zip(chunks) {
                self.send(peer, Phase::Scatter, Payload::Rows(chunk))?;
            }
            Ok(own)
        } else {
            match self.recv(Phase::Scatter)?.payload {
                Payload::Rows(rows) => Ok(rows),
                Payload::Header(_) => Err(self.unexpected(Phase::Scatter, "header")),
            }
        }
    }

    /// Every rank contributes `local`. The coordinator gets `Some` with the
    /// contributions ordered by sender rank, whatever order they arrived in;
    /// other ranks get `None`.
    pub fn gather(&self, local: Vec<u8>) -> TopologyResult<Option<Vec<Vec<u8>>>> {
        if !self.is_coordinator() {
            self.send(COORDINATOR, Phase::Gather, Payload::Rows(local))?;
            return Ok(None);
        }

        let mut slots: Vec<Option<Vec<u8>>> = (0..self.size).map(|_| None).collect();
        slots[COORDINATOR] = Some(local);
        for _ in 1..self.size {
            let envelope = self.recv(Phase::Gather)?;
            let rows = match envelope.payload {
                Payload::Rows(rows) => rows,
                Payload::Header(_) => return Err(self.unexpected(Phase::Gather, "header")),
            };
            let slot = slots.get_mut(envelope.from).ok_or_else(|| {
                RowGrayError::transport_failed(self.rank, "gather", "sender rank out of range")
            })?;
            if slot.replace(rows).is_some() {
                return Err(RowGrayError::transport_failed(
                    self.rank,
                    "gather",
                    format!("rank {} sent twice", envelope.from),
                ));
            }
        }

        slots
            .into_iter()
            .collect::<Option<Vec<_>>>()
            .map(Some)
            .ok_or_else(|| {
                RowGrayError::transport_failed(self.rank, "gather", "missing contribution")
            })
    }

    fn workers(&self) -> impl Iterator<Item = usize> {
        (0..self.size).filter(|&r| r != COORDINATOR)
    }

    fn send(&self, to: usize, phase: Phase, payload: Payload<H>) -> TopologyResult<()> {
        let link = self
            .links
            .get(to)
            .and_then(Option::as_ref)
            .ok_or_else(|| {
                RowGrayError::transport_failed(
                    self.rank,
                    phase.name(),
                    format!("no link to rank {to}"),
                )
            })?;
        link.send(Envelope {
            from: self.rank,
            phase,
            payload,
        })
        .map_err(|_| {
            RowGrayError::transport_failed(self.rank, phase.name(), format!("rank {to} hung up"))
        })
    }

    fn recv(&self, phase: Phase) -> TopologyResult<Envelope<H>> {
        let envelope = self.inbox.recv().map_err(|_| {
            RowGrayError::transport_failed(self.rank, phase.name(), "all peers hung up")
        })?;
        if envelope.phase != phase {
            return Err(RowGrayError::transport_failed(
                self.rank,
                phase.name(),
                format!(
                    "out-of-order {} message from rank {}",
                    envelope.phase.name(),
                    envelope.from
                ),
            ));
        }
        Ok(envelope)
    }

    fn unexpected(&self, phase: Phase, got: &'static str) -> RowGrayError {
        RowGrayError::transport_failed(self.rank, phase.name(), format!("unexpected {got} payload"))
    }
}

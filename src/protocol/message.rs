use crate::types::Rank;

/// Control and data messages exchanged between chorus participants.
///
/// Collective round payloads do NOT flow through this enum: they ride
/// dedicated raw uni-streams with a length prefix, avoiding serializer
/// overhead on bulk bytes.
#[derive(rkyv::Archive, rkyv::Serialize, rkyv::Deserialize, Debug, Clone, PartialEq)]
pub enum ChorusMessage {
    /// Initial handshake from a joining participant to the seed.
    Hello {
        protocol_version: u16,
        capabilities: u64,
    },

    /// Seed's response with rank assignment and the peer roster.
    Welcome {
        rank: Rank,
        size: u32,
        /// `(rank, socket_addr_string)` for each participant.
        peers: Vec<(Rank, String)>,
    },

    /// Barrier arrival: all ranks must reach this epoch before proceeding.
    Barrier { epoch: u64 },

    /// Barrier acknowledgement from the coordinator (two-phase algorithm).
    BarrierAck { epoch: u64 },

    /// Tagged point-to-point data envelope.
    Data {
        tag: crate::types::Tag,
        src_rank: Rank,
        payload: Vec<u8>,
    },
}

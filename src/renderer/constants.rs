//! Batching constants shared by the compiler and the render support.

/// Number of quads a freshly created batch has room for.
pub const INITIAL_BATCH_CAPACITY: usize = 16;

/// Upper bound of quads in a single batch.
/// Keeps every vertex index addressable with a `u16` index buffer.
pub const MAX_NUM_QUADS: usize = 8192;

pub const VERTICES_PER_QUAD: usize = 4;

pub const INDICES_PER_QUAD: usize = 6;

const _: () = assert!(MAX_NUM_QUADS * VERTICES_PER_QUAD <= u16::MAX as usize + 1);

/// Triangulation of a single quad (TL, TR, BL, BR).
pub const QUAD_INDICES: [u16; INDICES_PER_QUAD] = [0, 1, 2, 1, 3, 2];

// Marker payload coding: CRC-12, Hamming(7,4), the code table, and the
// 6x6 code-grid layout.

/// Width of the square code area, in cells.
pub const CODE_GRID_WIDTH: usize = 6;

/// Number of usable marker numbers (`0..MARKER_COUNT`).
pub const MARKER_COUNT: usize = 229;

/// A code grid read from (or rendered onto) a marker; `true` is a black cell.
pub type CodeGrid = [[bool; CODE_GRID_WIDTH]; CODE_GRID_WIDTH];

const CRC_WIDTH: u32 = 12;
const CRC_POLYNOMIAL: [u32; 6] = [12, 11, 3, 2, 1, 0];

const BLOCKS: usize = 5;
const BLOCK_BITS: usize = 7;

/// Raw payload bytes that never appear on a marker.
const BAD_CODES: [u8; 27] = [
    2, 3, 8, 9, 11, 13, 17, 19, 34, 42, 45, 46, 48, 51, 79, 95, 96, 114, 126, 127, 159, 160, 178,
    198, 200, 208, 255,
];

const fn reflect(num: u16, width: u32) -> u16 {
    let mut out = 0;
    let mut i = 0;
    while i < width {
        out |= ((num >> i) & 0x1) << (width - 1 - i);
        i += 1;
    }
    out
}

const fn crc_poly_mask() -> u16 {
    let mut word: u32 = 0;
    let mut i = 0;
    while i < CRC_POLYNOMIAL.len() {
        word |= 1 << CRC_POLYNOMIAL[i];
        i += 1;
    }
    // LSB-first: reflect the polynomial without its implicit top bit.
    reflect((word & ((1 << CRC_WIDTH) - 1)) as u16, CRC_WIDTH)
}

const POLY_MASK: u16 = crc_poly_mask();

/// 12-bit CRC of a single byte (seed 0, LSB first, no final xor).
pub fn crc12(input: u8) -> u16 {
    let mut value: u16 = 0;
    for i in 0..8 {
        let bit = (input >> i) & 0x1;
        let out_bit = (value & 0x1) as u8;
        value >>= 1;
        if out_bit ^ bit != 0 {
            value ^= POLY_MASK;
        }
    }
    value & 0xFFF
}

const fn forward_table() -> [i16; 256] {
    let mut table = [-1i16; 256];
    let mut count = 0;
    let mut raw = 0;
    while raw < 256 {
        let mut bad = false;
        let mut j = 0;
        while j < BAD_CODES.len() {
            if BAD_CODES[j] as usize == raw {
                bad = true;
            }
            j += 1;
        }
        if !bad {
            table[raw] = count;
            count += 1;
        }
        raw += 1;
    }
    table
}

const fn reverse_table() -> [u8; MARKER_COUNT] {
    let forward = forward_table();
    let mut table = [0u8; MARKER_COUNT];
    let mut raw = 0;
    while raw < 256 {
        if forward[raw] >= 0 {
            table[forward[raw] as usize] = raw as u8;
        }
        raw += 1;
    }
    table
}

const FORWARD: [i16; 256] = forward_table();
const REVERSE: [u8; MARKER_COUNT] = reverse_table();

/// Marker number carried by a raw payload byte, if the byte is in use.
pub fn marker_number(raw: u8) -> Option<u8> {
    u8::try_from(FORWARD[raw as usize]).ok()
}

/// Raw payload byte printed for a marker number.
pub fn raw_code(marker: u8) -> Option<u8> {
    REVERSE.get(marker as usize).copied()
}

/// Hamming(7,4) codeword for data bits `[d1, d2, d3, d4]`, laid out as
/// `[p1, p2, d1, p3, d2, d3, d4]`.
pub fn hamming_encode(data: [u8; 4]) -> [u8; 7] {
    let [d1, d2, d3, d4] = data;
    [
        (d1 + d2 + d4) % 2,
        (d1 + d3 + d4) % 2,
        d1,
        (d2 + d3 + d4) % 2,
        d2,
        d3,
        d4,
    ]
}

/// Decodes a Hamming(7,4) codeword, correcting up to one flipped bit.
pub fn hamming_decode(mut block: [u8; 7]) -> [u8; 4] {
    let z1 = (block[0] + block[2] + block[4] + block[6]) % 2;
    let z2 = (block[1] + block[2] + block[5] + block[6]) % 2;
    let z3 = (block[3] + block[4] + block[5] + block[6]) % 2;
    let syndrome = (z1 + z2 * 2 + z3 * 4) as usize;
    if syndrome != 0 {
        block[syndrome - 1] ^= 1;
    }
    [block[2], block[4], block[5], block[6]]
}

/// Position of payload bit `bit` of Hamming block `block` in the code grid.
fn cell(bit: usize, block: usize) -> (usize, usize) {
    let k = bit * BLOCKS + block;
    (k / CODE_GRID_WIDTH, k % CODE_GRID_WIDTH)
}

/// 20-bit payload for a raw code: CRC-12 of `raw + 1` above the raw byte.
fn payload(raw: u8) -> u32 {
    ((crc12(raw.wrapping_add(1)) as u32) << 8) | raw as u32
}

/// Code grid printed on marker `marker`; `None` past the last marker number.
pub fn encode(marker: u8) -> Option<CodeGrid> {
    let code = payload(raw_code(marker)?);
    let mut grid = [[false; CODE_GRID_WIDTH]; CODE_GRID_WIDTH];

    for block in 0..BLOCKS {
        let nibble = [0, 1, 2, 3].map(|j| ((code >> (block * 4 + j)) & 0x1) as u8);
        let encoded = hamming_encode(nibble);
        for (bit, &value) in encoded.iter().enumerate() {
            let (row, col) = cell(bit, block);
            grid[row][col] = value == 1;
        }
    }
    Some(grid)
}

/// Marker number stored in `grid`, or `None` when the CRC or code table
/// rejects it.
pub fn decode(grid: &CodeGrid) -> Option<u8> {
    let mut code: u32 = 0;
    for block in 0..BLOCKS {
        let mut encoded = [0u8; BLOCK_BITS];
        for (bit, value) in encoded.iter_mut().enumerate() {
            let (row, col) = cell(bit, block);
            *value = grid[row][col] as u8;
        }
        let nibble = hamming_decode(encoded);
        for (j, &value) in nibble.iter().enumerate() {
            code |= (value as u32) << (block * 4 + j);
        }
    }

    let raw = (code & 0xFF) as u8;
    let crc = (code >> 8) as u16;
    if crc12(raw.wrapping_add(1)) != crc {
        return None;
    }
    marker_number(raw)
}

/// Rotates a code grid 90 degrees clockwise.
pub fn rotate_clockwise(grid: &CodeGrid) -> CodeGrid {
    let n = CODE_GRID_WIDTH;
    let mut out = [[false; CODE_GRID_WIDTH]; CODE_GRID_WIDTH];
    for (row, cells) in grid.iter().enumerate() {
        for (col, &value) in cells.iter().enumerate() {
            out[col][n - 1 - row] = value;
        }
    }
    out
}

/// Tries each orientation of `grid`; returns the marker number and the number
/// of clockwise quarter turns that brought the grid upright.
pub fn recover(grid: &CodeGrid) -> Option<(u8, u8)> {
    let mut candidate = *grid;
    for turns in 0..4u8 {
        if let Some(marker) = decode(&candidate) {
            return Some((marker, turns));
        }
        candidate = rotate_clockwise(&candidate);
    }
    None
}

//! Copying between row-major arrays and fixed-shape chunks.

use crate::util::{Error, Result};

/// Visit the rows of the chunk at `offset` that fall inside `dims`.
///
/// `f(chunk_pos, array_pos, len)` receives element positions of the row
/// start in the chunk and in the array, plus the in-bounds row length.
/// All three slices must have the same non-zero rank.
fn for_each_row(dims: &[usize], chunk: &[usize], offset: &[usize], mut f: impl FnMut(usize, usize, usize)) {
    let rank = dims.len();
    if rank == 0 || offset.iter().zip(dims).any(|(o, d)| o >= d) {
        return;
    }
    let last = rank - 1;
    let run = chunk[last].min(dims[last] - offset[last]);
    let mut idx = vec![0usize; last];

    loop {
        let (mut c, mut a) = (0usize, 0usize);
        for k in 0..last {
            c = c * chunk[k] + idx[k];
            a = a * dims[k] + offset[k] + idx[k];
        }
        f(c * chunk[last], a * dims[last] + offset[last], run);

        let mut k = last;
        loop {
            if k == 0 {
                return;
            }
            k -= 1;
            idx[k] += 1;
            if idx[k] < chunk[k] && offset[k] + idx[k] < dims[k] {
                break;
            }
            idx[k] = 0;
        }
    }
}

/// Byte size of one chunk.
pub(crate) fn chunk_bytes(chunk: &[usize], elem: usize) -> Result<usize> {
    chunk
        .iter()
        .try_fold(elem, |n, &c| n.checked_mul(c))
        .ok_or_else(|| Error::invalid("chunk size overflows"))
}

/// Copy the chunk at `offset` out of `array` into a zero-padded chunk image.
pub(crate) fn gather(array: &[u8], dims: &[usize], chunk: &[usize], offset: &[usize], elem: usize, out: &mut [u8]) {
    out.fill(0);
    for_each_row(dims, chunk, offset, |c, a, n| {
        out[c * elem..(c + n) * elem].copy_from_slice(&array[a * elem..(a + n) * elem]);
    });
}

/// Copy the in-bounds part of a decoded chunk into `array`.
pub(crate) fn scatter(array: &mut [u8], dims: &[usize], chunk: &[usize], offset: &[usize], elem: usize, src: &[u8]) -> Result<()> {
    if offset.len() != dims.len() || chunk.len() != dims.len() || src.len() != chunk_bytes(chunk, elem)? {
        return Err(Error::invalid("chunk does not match dataset layout"));
    }
    for_each_row(dims, chunk, offset, |c, a, n| {
        array[a * elem..(a + n) * elem].copy_from_slice(&src[c * elem..(c + n) * elem]);
    });
    Ok(())
}

/// Advance a row-major multi-index. Returns false after the last one.
pub(crate) fn next_index(index: &mut [usize], bounds: &[usize]) -> bool {
    for k in (0..index.len()).rev() {
        index[k] += 1;
        if index[k] < bounds[k] {
            return true;
        }
        index[k] = 0;
    }
    false
}

/// Number of chunks along each dimension.
pub(crate) fn grid(dims: &[usize], chunk: &[usize]) -> Vec<usize> {
    dims.iter().zip(chunk).map(|(d, c)| d.div_ceil(*c)).collect()
}


use log::debug;

use crate::error::{Error, Result};

/// Drive a windowed read until `depth` bytes have been accumulated.
///
/// `fetch(start, stop)` performs one windowed transfer over the inclusive
/// 1-based sample range and returns the de-framed payload, which may be
/// shorter than the window when the instrument caps a single transfer.  The
/// next window advances by however many bytes actually arrived, so the
/// reassembled buffer is exactly `depth` bytes in original sample order.
pub fn read_paged<F>(depth: usize, page_limit: usize, mut fetch: F) -> Result<Vec<u8>>
where
    F: FnMut(usize, usize) -> Result<Vec<u8>>,
{
    let mut data: Vec<u8> = Vec::with_capacity(depth);
    let mut start: usize = 1;
    let mut stop: usize = depth.min(page_limit);

    while data.len() < depth {
        let page: Vec<u8> = fetch(start, stop)?;
        if page.is_empty() {
            // A stuck transport would otherwise have us asking for the same
            // window forever
            return Err(Error::Transport(format!(
                "empty page at sample {} of {}",
                start, depth
            )));
        }

        start += page.len();
        stop = if stop + page.len() > depth { depth } else { stop + page.len() };

        data.extend_from_slice(&page);
        debug!("transferred {} of {} samples", data.len(), depth);
    }

    data.truncate(depth);
    Ok(data)
}

// CV document handling: plain-text extraction, section segmentation, and
// candidate identity heuristics. Everything here is synchronous text work
// except PDF extraction, which runs on the blocking pool.

pub mod extract;
pub mod identity;
pub mod segmenter;

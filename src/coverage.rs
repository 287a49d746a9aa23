//!
//! Per-file read-coverage tracking, used for reverse-engineering heatmaps.
//!
/// Boolean array of length `file.length`, set to `true` for every byte
/// consumed through reads on this file. Exported as a byte image for
/// RE tooling: `0xFF` for read bytes, `0x00` otherwise.
#[derive(Debug, Clone)]
pub struct FileReadMap
{
    read: Vec<bool>,
}

impl FileReadMap
{
    pub fn new(length: usize) -> Self
    {
        Self { read: vec![false; length] }
    }

    pub fn len(&self) -> usize
    {
        self.read.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.read.is_empty()
    }

    /// Marks `count` bytes starting at `offset` as read. Positions beyond the
    /// map's length are silently ignored — encoded blocks may report offsets
    /// relative to a scratch stream larger than the outer file.
    pub fn mark_read(&mut self, offset: u64, count: u64)
    {
        let start = offset as usize;
        let end = (offset + count) as usize;
        let end = end.min(self.read.len());

        for slot in self.read.iter_mut().take(end).skip(start.min(end)) {
            *slot = true;
        }
    }

    /// Number of distinct bytes marked as read.
    pub fn covered_count(&self) -> usize
    {
        self.read.iter().filter(|&&b| b).count()
    }

    /// Exports the map as a byte image: `0xFF` for read bytes, `0x00` otherwise.
    pub fn to_image(&self) -> Vec<u8>
    {
        self.read.iter().map(|&b| if b { 0xFF } else { 0x00 }).collect()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn marks_and_reports_coverage()
    {
        let mut map = FileReadMap::new(8);
        map.mark_read(2, 3);

        assert_eq!(map.covered_count(), 3);
        assert_eq!(map.to_image(), vec![0, 0, 0xFF, 0xFF, 0xFF, 0, 0, 0]);
    }

    #[test]
    fn clamps_out_of_range_marks()
    {
        let mut map = FileReadMap::new(4);
        map.mark_read(2, 10);

        assert_eq!(map.covered_count(), 2);
    }
}

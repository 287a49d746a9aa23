//!
//! A `Read + Write + Seek` view over a `Vec<u8>` shared by reference, so bytes
//! written through one handle stay visible to anyone else holding the same
//! buffer after the writing [`crate::io::Writer`] is closed.
//!
use std::cell::RefCell;
use std::io::Read;
use std::io::Seek;
use std::io::SeekFrom;
use std::io::Write;
use std::rc::Rc;

#[derive(Clone)]
pub struct SharedBuffer
{
    data: Rc<RefCell<Vec<u8>>>,
    position: usize,
}

impl SharedBuffer
{
    pub fn new(data: Rc<RefCell<Vec<u8>>>) -> Self
    {
        Self { data, position: 0 }
    }

    pub fn snapshot(&self) -> Vec<u8>
    {
        self.data.borrow().clone()
    }
}

impl Read for SharedBuffer
{
    fn read(&mut self, out: &mut [u8]) -> std::io::Result<usize>
    {
        let data = self.data.borrow();
        let available = data.len().saturating_sub(self.position);
        let n = out.len().min(available);
        out[..n].copy_from_slice(&data[self.position..self.position + n]);
        self.position += n;
        Ok(n)
    }
}

impl Write for SharedBuffer
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize>
    {
        let mut data = self.data.borrow_mut();
        let end = self.position + buf.len();
        if data.len() < end {
            data.resize(end, 0);
        }
        data[self.position..end].copy_from_slice(buf);
        self.position = end;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()>
    {
        Ok(())
    }
}

impl Seek for SharedBuffer
{
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64>
    {
        let len = self.data.borrow().len() as i64;
        let new_pos = match pos {
            SeekFrom::Start(p) => p as i64,
            SeekFrom::End(p) => len + p,
            SeekFrom::Current(p) => self.position as i64 + p,
        };
        if new_pos < 0 {
            return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, "negative seek"));
        }
        self.position = new_pos as usize;
        Ok(self.position as u64)
    }
}

use std::io::{self, Read};

use crate::transfer::core::{Datagram, read_chunk};

/// Splits a byte stream into sequenced data datagrams plus a completion marker
///
/// Sequence numbers start at 1 and grow by one per chunk. Every data chunk
/// except possibly the last holds exactly `chunk_size` bytes. After the last
/// data chunk the iterator yields one [`Datagram::Complete`] and then stops.
pub struct Chunker<R> {
    reader: R,
    buf: Vec<u8>,
    next_seq: u32,
    done: bool,
}

impl<R: Read> Chunker<R> {
    pub fn new(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            buf: vec![0u8; chunk_size],
            next_seq: 1,
            done: false,
        }
    }

    /// Data chunks produced so far
    pub fn data_chunks(&self) -> u32 {
        self.next_seq - 1
    }
}

impl<R: Read> Iterator for Chunker<R> {
    type Item = io::Result<Datagram>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let n = match read_chunk(&mut self.reader, &mut self.buf) {
            Ok(n) => n,
            Err(e) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        if n == 0 {
            self.done = true;
            return Some(Ok(Datagram::Complete { seq: self.next_seq }));
        }

        let seq = self.next_seq;
        self.next_seq += 1;
        Some(Ok(Datagram::Data {
            seq,
            payload: self.buf[..n].to_vec(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(content: &[u8], chunk_size: usize) -> Vec<Datagram> {
        Chunker::new(content, chunk_size)
            .collect::<io::Result<Vec<_>>>()
            .unwrap()
    }

    #[test]
    fn hello_world_is_one_chunk_and_a_marker() {
        let wire: Vec<Vec<u8>> = chunks(b"Hello World", 1000)
            .iter()
            .map(Datagram::encode)
            .collect();
        assert_eq!(
            wire,
            vec![b"0001:Hello World".to_vec(), b"0002:FILE_TRANSFER_COMPLETE".to_vec()]
        );
    }

    #[test]
    fn chunk_count_is_ceiling_of_size_over_chunk() {
        let content: Vec<u8> = (0..2500u32).map(|i| (i % 251) as u8).collect();
        let out = chunks(&content, 1000);

        assert_eq!(out.len(), 4);
        let mut rebuilt = Vec::new();
        for (i, d) in out[..3].iter().enumerate() {
            match d {
                Datagram::Data { seq, payload } => {
                    assert_eq!(*seq, i as u32 + 1);
                    rebuilt.extend_from_slice(payload);
                }
                other => panic!("expected data, got {:?}", other),
            }
        }
        assert_eq!(rebuilt, content);
        assert_eq!(out[3], Datagram::Complete { seq: 4 });
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let out = chunks(&[7u8; 3000], 1000);
        assert_eq!(out.len(), 4);
        assert_eq!(out[3], Datagram::Complete { seq: 4 });
    }

    #[test]
    fn empty_file_sends_only_the_marker() {
        let mut chunker = Chunker::new(&b""[..], 1000);
        assert_eq!(chunker.next().unwrap().unwrap(), Datagram::Complete { seq: 1 });
        assert!(chunker.next().is_none());
        assert_eq!(chunker.data_chunks(), 0);
    }
}

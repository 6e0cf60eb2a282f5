use std::io;

use crate::boxes::prelude::*;

def_box! {
    /// 8.6.1.2 Decoding Time to Sample Box (ISO/IEC 14496-12:2015(E))
    #[derive(Default)]
    TimeToSampleBox {
        entries:        ArraySized32<TimeToSampleEntry>,
    },
    fourcc => "stts",
    version => [0],
    impls => [ boxinfo, debug, fromtobytes, fullbox ],
}

def_struct! {
    /// Entry in TimeToSampleBox.
    #[derive(Default)]
    TimeToSampleEntry,
        count:  u32,
        delta:  u32,
}

impl TimeToSampleBox {
    /// Return an iterator that yields (delta, cumulative) per sample.
    pub fn iter(&self) -> TimeToSampleIterator<'_> {
        let mut iter = TimeToSampleIterator {
            entries:    &self.entries[..],
            entry:      TimeToSampleEntry::default(),
            index:      0,
            cumulative: 0,
        };
        if iter.entries.len() > 0 {
            iter.entry = iter.entries[0].clone();
        }
        iter
    }

    /// Total number of samples described.
    pub fn sample_count(&self) -> u64 {
        self.entries.iter().map(|e| e.count as u64).sum()
    }

    /// Sum of all sample durations.
    pub fn total_duration(&self) -> u64 {
        self.entries.iter().map(|e| e.count as u64 * e.delta as u64).sum()
    }
}

#[derive(Clone)]
pub struct TimeToSampleIterator<'a> {
    entries:    &'a [TimeToSampleEntry],
    entry:      TimeToSampleEntry,
    index:      usize,
    cumulative: u64,
}

impl<'a> Iterator for TimeToSampleIterator<'a> {
    type Item = (u32, u64);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.entry.count > 0 {
                self.entry.count -= 1;
                let cumulative = self.cumulative;
                self.cumulative += self.entry.delta as u64;
                return Some((self.entry.delta, cumulative));
            }
            self.index += 1;
            if self.index >= self.entries.len() {
                return None;
            }
            self.entry = self.entries[self.index].clone();
        }
    }
}

/*
Copyright 2021 Google LLC

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    https://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use std::cell::RefCell;

/// A lazily evaluated, replayable sequence.
///
/// Items are pulled from the source iterator on demand and cached; every
/// `iter()` replays from the start. Once the source is exhausted it is
/// dropped so it releases whatever it captured.
pub struct MemoizedSequence<I: Iterator> {
    cache: RefCell<Vec<I::Item>>,
    source: RefCell<Option<I>>,
}

impl<I: Iterator> MemoizedSequence<I>
where
    I::Item: Clone,
{
    pub fn new(source: I) -> Self {
        MemoizedSequence {
            cache: RefCell::new(Vec::new()),
            source: RefCell::new(Some(source)),
        }
    }

    pub fn iter(&self) -> MemoizedIter<'_, I> {
        MemoizedIter {
            sequence: self,
            position: 0,
        }
    }

    fn get(&self, position: usize) -> Option<I::Item> {
        if let Some(item) = self.cache.borrow().get(position) {
            return Some(item.clone());
        }
        let mut source = self.source.borrow_mut();
        loop {
            let next = match source.as_mut() {
                Some(iterator) => iterator.next(),
                None => return None,
            };
            match next {
                Some(item) => {
                    self.cache.borrow_mut().push(item);
                    if self.cache.borrow().len() > position {
                        return self.cache.borrow().get(position).cloned();
                    }
                }
                None => {
                    *source = None;
                    return None;
                }
            }
        }
    }
}

pub struct MemoizedIter<'a, I: Iterator> {
    sequence: &'a MemoizedSequence<I>,
    position: usize,
}

impl<'a, I: Iterator> Iterator for MemoizedIter<'a, I>
where
    I::Item: Clone,
{
    type Item = I::Item;

    fn next(&mut self) -> Option<I::Item> {
        let item = self.sequence.get(self.position);
        if item.is_some() {
            self.position += 1;
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn source_is_pulled_once() {
        let pulls = Cell::new(0usize);
        let source = (0..4).map(|i| {
            pulls.set(pulls.get() + 1);
            i * 10
        });
        let sequence = MemoizedSequence::new(source);
        assert_eq!(sequence.iter().take(2).collect::<Vec<_>>(), vec![0, 10]);
        assert_eq!(pulls.get(), 2);
        assert_eq!(sequence.iter().collect::<Vec<_>>(), vec![0, 10, 20, 30]);
        assert_eq!(pulls.get(), 4);
        // Replay hits only the cache.
        assert_eq!(sequence.iter().collect::<Vec<_>>(), vec![0, 10, 20, 30]);
        assert_eq!(pulls.get(), 4);
    }

    #[test]
    fn exhaustion_releases_source() {
        let sequence = MemoizedSequence::new(std::iter::empty::<u8>());
        assert_eq!(sequence.iter().next(), None);
        assert!(sequence.source.borrow().is_none());
    }
}

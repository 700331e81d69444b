//! Fixed-width bitsets over a category's local element indices.

const WORD: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct TargetSet {
    words: Vec<u64>,
}

impl TargetSet {
    pub fn empty(len: usize) -> Self {
        Self {
            words: vec![0; len.div_ceil(WORD)],
        }
    }

    pub fn full(len: usize) -> Self {
        let mut set = Self::empty(len);
        for i in 0..len {
            set.insert(i);
        }
        set
    }

    pub fn single(len: usize, index: usize) -> Self {
        let mut set = Self::empty(len);
        set.insert(index);
        set
    }

    pub fn insert(&mut self, index: usize) -> bool {
        let (word, bit) = (index / WORD, 1u64 << (index % WORD));
        let fresh = self.words[word] & bit == 0;
        self.words[word] |= bit;
        fresh
    }

    pub fn remove(&mut self, index: usize) -> bool {
        let (word, bit) = (index / WORD, 1u64 << (index % WORD));
        let present = self.words[word] & bit != 0;
        self.words[word] &= !bit;
        present
    }

    pub fn contains(&self, index: usize) -> bool {
        self.words
            .get(index / WORD)
            .map(|w| w & (1u64 << (index % WORD)) != 0)
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.words.iter().all(|w| *w == 0)
    }

    /// The only member, if there is exactly one.
    pub fn only(&self) -> Option<usize> {
        if self.len() == 1 {
            self.iter().next()
        } else {
            None
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(w, word)| {
            let mut bits = *word;
            std::iter::from_fn(move || {
                if bits == 0 {
                    return None;
                }
                let bit = bits.trailing_zeros() as usize;
                bits &= bits - 1;
                Some(w * WORD + bit)
            })
        })
    }

    /// Keep only members also in `other`. Returns whether anything was removed.
    pub fn intersect_with(&mut self, other: &TargetSet) -> bool {
        let mut changed = false;
        for (word, mask) in self.words.iter_mut().zip(&other.words) {
            let next = *word & mask;
            changed |= next != *word;
            *word = next;
        }
        changed
    }

    /// Remove every member of `other`. Returns whether anything was removed.
    pub fn subtract(&mut self, other: &TargetSet) -> bool {
        let mut changed = false;
        for (word, mask) in self.words.iter_mut().zip(&other.words) {
            let next = *word & !mask;
            changed |= next != *word;
            *word = next;
        }
        changed
    }

    pub fn union_with(&mut self, other: &TargetSet) {
        for (word, mask) in self.words.iter_mut().zip(&other.words) {
            *word |= mask;
        }
    }

    pub fn intersects(&self, other: &TargetSet) -> bool {
        self.words.iter().zip(&other.words).any(|(a, b)| a & b != 0)
    }

    pub fn is_subset(&self, other: &TargetSet) -> bool {
        self.words.iter().zip(&other.words).all(|(a, b)| a & !b == 0)
    }
}

//! Partitioned in-process dataset.
//!
//! Stands in for a distributed collection: items live in ordered partitions,
//! per-partition transforms run on the rayon pool, and [`Dataset::group_by_key`]
//! is the single shuffle primitive. Output partition `i` of every
//! per-partition transform is computed from input partition `i` alone.

use std::collections::BTreeMap;

use rayon::prelude::*;

#[derive(Debug, Clone, PartialEq)]
pub struct Dataset<T> {
    partitions: Vec<Vec<T>>,
}

impl<T> Default for Dataset<T> {
    fn default() -> Self {
        Self {
            partitions: vec![Vec::new()],
        }
    }
}

impl<T: Send + Sync> Dataset<T> {
    /// Wraps existing partitions; an empty list becomes one empty partition.
    pub fn from_partitions(partitions: Vec<Vec<T>>) -> Self {
        if partitions.is_empty() {
            return Self::default();
        }
        Self { partitions }
    }

    /// Splits `items` into `num_partitions` contiguous chunks, keeping order.
    ///
    /// Partition `i` receives `items[i * len / n .. (i + 1) * len / n]`.
    pub fn parallelize(items: Vec<T>, num_partitions: usize) -> Self {
        let n = num_partitions.max(1);
        let len = items.len();
        let mut iter = items.into_iter();
        let partitions = (0..n)
            .map(|i| {
                let size = (i + 1) * len / n - i * len / n;
                iter.by_ref().take(size).collect()
            })
            .collect();
        Self { partitions }
    }

    /// Number of partitions, empty ones included.
    pub fn partition_count(&self) -> usize {
        self.partitions.len()
    }

    /// Read-only view of every partition, in partition order.
    pub fn partitions(&self) -> &[Vec<T>] {
        &self.partitions
    }

    /// Total number of items across all partitions.
    pub fn len(&self) -> usize {
        self.partitions.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.partitions.iter().all(Vec::is_empty)
    }

    /// Items in global order: partition by partition.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.partitions.iter().flatten()
    }

    /// Flattens the partitions into one vector in global order.
    pub fn collect(self) -> Vec<T> {
        self.partitions.into_iter().flatten().collect()
    }

    /// Runs `f(partition_id, items)` for every partition in parallel.
    ///
    /// # Arguments
    /// * `f` - Builds output partition `i` from input partition `i` and its id.
    ///
    /// # Returns
    /// * `Dataset<U>` - A dataset with the same number of partitions.
    pub fn map_partitions<U, F>(&self, f: F) -> Dataset<U>
    where
        U: Send,
        F: Fn(usize, &[T]) -> Vec<U> + Sync + Send,
    {
        let partitions = self
            .partitions
            .par_iter()
            .enumerate()
            .map(|(id, part)| f(id, part))
            .collect();
        Dataset { partitions }
    }

    /// Fallible [`map_partitions`](Self::map_partitions); any partition error
    /// aborts the whole transform.
    pub fn try_map_partitions<U, E, F>(&self, f: F) -> Result<Dataset<U>, E>
    where
        U: Send,
        E: Send,
        F: Fn(usize, &[T]) -> Result<Vec<U>, E> + Sync + Send,
    {
        let partitions = self
            .partitions
            .par_iter()
            .enumerate()
            .map(|(id, part)| f(id, part))
            .collect::<Result<Vec<_>, E>>()?;
        Ok(Dataset { partitions })
    }

    /// Applies `f` to every item, keeping partition boundaries.
    pub fn map<U, F>(&self, f: F) -> Dataset<U>
    where
        U: Send,
        F: Fn(&T) -> U + Sync + Send,
    {
        self.map_partitions(|_, part| part.iter().map(&f).collect())
    }

    /// Replaces every item with the items `f` yields for it, in order and in
    /// the same partition.
    pub fn flat_map<U, I, F>(&self, f: F) -> Dataset<U>
    where
        U: Send,
        I: IntoIterator<Item = U>,
        F: Fn(&T) -> I + Sync + Send,
    {
        self.map_partitions(|_, part| part.iter().flat_map(&f).collect())
    }

    /// Keeps the items for which `pred` is true. Partitions may end up empty
    /// but are never removed.
    pub fn filter<F>(&self, pred: F) -> Dataset<T>
    where
        T: Clone,
        F: Fn(&T) -> bool + Sync + Send,
    {
        self.map_partitions(|_, part| part.iter().filter(|t| pred(*t)).cloned().collect())
    }

    /// Folds every partition with `seq` starting from `zero()`, then combines
    /// the partial results in partition order with `comb`.
    ///
    /// # Arguments
    /// * `zero` - Produces the starting accumulator, once per partition and once
    ///   for the final combine.
    /// * `seq` - Adds one item to a partition's accumulator.
    /// * `comb` - Merges two accumulators; called on the calling thread.
    ///
    /// # Returns
    /// * `A` - The combined accumulator.
    pub fn aggregate<A, Z, S, C>(&self, zero: Z, seq: S, comb: C) -> A
    where
        A: Send,
        Z: Fn() -> A + Sync + Send,
        S: Fn(A, &T) -> A + Sync + Send,
        C: Fn(A, A) -> A,
    {
        let partials: Vec<A> = self
            .partitions
            .par_iter()
            .map(|part| part.iter().fold(zero(), &seq))
            .collect();
        partials.into_iter().fold(zero(), comb)
    }
}

impl<K, V> Dataset<(K, V)>
where
    K: Ord + Send + Sync,
    V: Send + Sync,
{
    /// Groups values by key across all partitions.
    ///
    /// Values of a key keep their global order (source partition, then
    /// position in partition). Keys come out sorted and range-partitioned
    /// into `num_partitions` contiguous chunks, so the result does not depend
    /// on how threads were scheduled.
    pub fn group_by_key(self, num_partitions: usize) -> Dataset<(K, Vec<V>)> {
        let locals: Vec<BTreeMap<K, Vec<V>>> = self
            .partitions
            .into_par_iter()
            .map(|part| {
                let mut groups: BTreeMap<K, Vec<V>> = BTreeMap::new();
                for (k, v) in part {
                    groups.entry(k).or_default().push(v);
                }
                groups
            })
            .collect();

        let mut merged: BTreeMap<K, Vec<V>> = BTreeMap::new();
        for local in locals {
            for (k, mut vs) in local {
                merged.entry(k).or_default().append(&mut vs);
            }
        }
        Dataset::parallelize(merged.into_iter().collect(), num_partitions)
    }
}

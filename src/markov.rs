// Weighted-graph melodic generator.
//
// A `MelodicGraph` materializes one node per (scale degree, octave) pair
// of a key across an octave range and connects every ordered pair of
// distinct nodes with a weighted edge, defaulting to 1/(distance+1) so
// stepwise motion is favored over leaps. Melodies are weighted random
// walks over the graph; edge weights can be strengthened afterward to
// bias the walk toward resolution tones (root, fifth) before generating.
//
// Randomness is injected as `&mut impl Rng`; seed the generator to make
// output reproducible. Graphs are built once per generation run and never
// persisted.

use crate::error::{Error, Result};
use crate::key::Key;
use crate::note::Note;
use rand::Rng;

#[derive(Debug, Clone, Copy)]
struct Edge {
    to: usize,
    weight: f64,
}

/// A fully connected graph over the eligible pitches of a key.
#[derive(Debug, Clone)]
pub struct MelodicGraph {
    pitches: Vec<u8>,
    /// Outgoing edges per node, one per other node.
    edges: Vec<Vec<Edge>>,
}

impl MelodicGraph {
    /// Build the graph for every scale note of `key` in octaves
    /// `octave_min..=octave_max`, fully connected in both directions with
    /// distance-decayed default weights.
    pub fn new(key: &Key, octave_min: u8, octave_max: u8) -> MelodicGraph {
        let pitches: Vec<u8> = (octave_min..=octave_max)
            .flat_map(|octave| key.notes().map(|note| note.value_for_octave(octave)))
            .collect();

        let edges = pitches
            .iter()
            .enumerate()
            .map(|(from, &a)| {
                pitches
                    .iter()
                    .enumerate()
                    .filter(|&(to, _)| to != from)
                    .map(|(to, &b)| Edge {
                        to,
                        weight: 1.0 / ((a as i32 - b as i32).abs() as f64 + 1.0),
                    })
                    .collect()
            })
            .collect();

        MelodicGraph { pitches, edges }
    }

    /// Absolute pitches of the graph's nodes.
    pub fn pitches(&self) -> &[u8] {
        &self.pitches
    }

    /// Add `amount` to every edge whose endpoints' pitch classes match a
    /// given (from, to) pair and whose interval spans at most an octave.
    /// Biasing root->fifth and fifth->root this way pulls walks toward
    /// resolving motion.
    pub fn strengthen_connections(&mut self, pairs: &[(Note, Note)], amount: f64) {
        for (from, edges) in self.edges.iter_mut().enumerate() {
            let a = self.pitches[from];
            for edge in edges.iter_mut() {
                let b = self.pitches[edge.to];
                if (a as i32 - b as i32).abs() > 12 {
                    continue;
                }
                for &(pc_from, pc_to) in pairs {
                    if a % 12 == pc_from.pitch_class() && b % 12 == pc_to.pitch_class() {
                        edge.weight += amount;
                    }
                }
            }
        }
    }

    /// Generate a melody of `length` pitches by weighted random walk.
    /// The walk starts from the node nearest `start` when given, or from
    /// a uniformly random node.
    pub fn generate_sequence(
        &self,
        length: usize,
        start: Option<u8>,
        rng: &mut impl Rng,
    ) -> Result<Vec<u8>> {
        if length == 0 {
            return Err(Error::EmptySequence);
        }
        if self.pitches.is_empty() {
            return Err(Error::EmptyGraph);
        }

        let mut node = match start {
            Some(pitch) => self.nearest_node(pitch),
            None => rng.random_range(0..self.pitches.len()),
        };

        let mut sequence = Vec::with_capacity(length);
        sequence.push(self.pitches[node]);
        for _ in 1..length {
            node = self.step(node, rng);
            sequence.push(self.pitches[node]);
        }
        Ok(sequence)
    }

    /// Generate a companion line of the same length as `other`, starting
    /// from the node nearest that line's final pitch — a second voice
    /// that picks up where the first left off.
    pub fn follow(&self, other: &[u8], rng: &mut impl Rng) -> Result<Vec<u8>> {
        let last = *other.last().ok_or(Error::EmptySequence)?;
        self.generate_sequence(other.len(), Some(last), rng)
    }

    /// Sample the next node with probability proportional to edge weight.
    fn step(&self, from: usize, rng: &mut impl Rng) -> usize {
        let edges = &self.edges[from];
        let total: f64 = edges.iter().map(|e| e.weight).sum();
        let mut target = rng.random_range(0.0..total);
        for edge in edges {
            target -= edge.weight;
            if target < 0.0 {
                return edge.to;
            }
        }
        // Float summing can leave a sliver past the last edge.
        edges.last().map(|e| e.to).unwrap_or(from)
    }

    fn nearest_node(&self, pitch: u8) -> usize {
        let mut best = 0;
        for (i, &p) in self.pitches.iter().enumerate() {
            if (p as i32 - pitch as i32).abs() < (self.pitches[best] as i32 - pitch as i32).abs() {
                best = i;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::Mode;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn c_major_graph() -> MelodicGraph {
        MelodicGraph::new(&Key::new(Note::C, Mode::MAJOR), 2, 4)
    }

    #[test]
    fn node_count_and_membership() {
        let graph = c_major_graph();
        // 7 degrees across 3 octaves.
        assert_eq!(graph.pitches().len(), 21);
        assert!(graph.pitches().contains(&60));
        assert!(graph.pitches().contains(&48));
        // No chromatic neighbors of C major.
        assert!(!graph.pitches().contains(&61));
    }

    #[test]
    fn sequence_length_and_membership() {
        let graph = c_major_graph();
        let mut rng = StdRng::seed_from_u64(42);
        let melody = graph.generate_sequence(32, None, &mut rng).unwrap();
        assert_eq!(melody.len(), 32);
        for pitch in &melody {
            assert!(graph.pitches().contains(pitch), "{pitch} not in graph");
        }
    }

    #[test]
    fn zero_length_fails() {
        let graph = c_major_graph();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            graph.generate_sequence(0, None, &mut rng),
            Err(Error::EmptySequence)
        ));
    }

    #[test]
    fn inverted_octave_bounds_fail_fast() {
        // octave_min above octave_max leaves the graph with no nodes.
        let graph = MelodicGraph::new(&Key::new(Note::C, Mode::MAJOR), 5, 4);
        assert!(graph.pitches().is_empty());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(matches!(
            graph.generate_sequence(4, None, &mut rng),
            Err(Error::EmptyGraph)
        ));
        assert!(matches!(
            graph.generate_sequence(4, Some(60), &mut rng),
            Err(Error::EmptyGraph)
        ));
    }

    #[test]
    fn same_seed_same_walk() {
        let graph = c_major_graph();
        let mut a = StdRng::seed_from_u64(9);
        let mut b = StdRng::seed_from_u64(9);
        assert_eq!(
            graph.generate_sequence(16, None, &mut a).unwrap(),
            graph.generate_sequence(16, None, &mut b).unwrap()
        );
    }

    #[test]
    fn start_pitch_is_honored() {
        let graph = c_major_graph();
        let mut rng = StdRng::seed_from_u64(1);
        let melody = graph.generate_sequence(4, Some(60), &mut rng).unwrap();
        assert_eq!(melody[0], 60);
        // An off-scale start snaps to the nearest node.
        let snapped = graph.generate_sequence(4, Some(61), &mut rng).unwrap();
        assert!(snapped[0] == 60 || snapped[0] == 62);
    }

    #[test]
    fn follow_starts_near_the_end_of_the_other_line() {
        let graph = c_major_graph();
        let mut rng = StdRng::seed_from_u64(4);
        let lead = graph.generate_sequence(8, Some(64), &mut rng).unwrap();
        let reply = graph.follow(&lead, &mut rng).unwrap();
        assert_eq!(reply.len(), lead.len());
        assert_eq!(reply[0], *lead.last().unwrap());

        assert!(matches!(graph.follow(&[], &mut rng), Err(Error::EmptySequence)));
    }

    #[test]
    fn strengthen_biases_toward_pair() {
        let mut graph = c_major_graph();
        // Overwhelm the distance prior in favor of C -> G.
        graph.strengthen_connections(&[(Note::C, Note::G)], 1000.0);
        let mut rng = StdRng::seed_from_u64(2);
        let mut g_after_c = 0;
        let mut total = 0;
        for _ in 0..200 {
            let melody = graph.generate_sequence(2, Some(60), &mut rng).unwrap();
            total += 1;
            if melody[1] % 12 == 7 {
                g_after_c += 1;
            }
        }
        assert!(g_after_c as f64 / total as f64 > 0.9, "{g_after_c}/{total}");
    }
}

//! Deterministic hash embeddings
//!
//! Feature-hashing embedder over word unigrams and bigrams, FNV-1a based.
//! No model downloads, no network: the same text always maps to the same
//! L2-normalized vector, which is what the index build contract requires.

/// Projections per token. Each token contributes to this many dimensions
/// with a hash-derived sign.
const PROJECTIONS: u64 = 8;

/// Weight applied to bigram features relative to unigrams.
const BIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic text embedder with a fixed dimensionality.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dims: usize,
}

impl Default for HashEmbedder {
    fn default() -> Self {
        Self { dims: 384 }
    }
}

impl HashEmbedder {
    #[must_use]
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }

    #[must_use]
    pub fn dims(&self) -> usize {
        self.dims
    }

    /// Embed text into an L2-normalized vector.
    #[must_use]
    pub fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        if self.dims == 0 {
            return vector;
        }

        let tokens = tokenize(text);
        for token in &tokens {
            self.project(&mut vector, token, 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{}\u{1f}{}", pair[0], pair[1]);
            self.project(&mut vector, &bigram, BIGRAM_WEIGHT);
        }

        l2_normalize(&mut vector);
        vector
    }

    fn project(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let base = fnv1a(feature.as_bytes());
        for salt in 0..PROJECTIONS {
            let h = fnv1a_u64(base ^ salt.wrapping_mul(0x9e37_79b9_7f4a_7c15));
            let dim = ((h >> 1) as usize) % vector.len();
            if h & 1 == 0 {
                vector[dim] += weight;
            } else {
                vector[dim] -= weight;
            }
        }
    }
}

/// Dot product; equals cosine similarity for L2-normalized inputs.
#[must_use]
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| token.len() >= 2)
        .map(str::to_string)
        .collect()
}

fn fnv1a(data: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    for byte in data {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(PRIME);
    }
    hash
}

fn fnv1a_u64(value: u64) -> u64 {
    fnv1a(&value.to_le_bytes())
}

fn l2_normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_deterministic() {
        let embedder = HashEmbedder::new(128);
        let a = embedder.embed("tell me about a time you led a project");
        let b = embedder.embed("tell me about a time you led a project");
        assert_eq!(a, b);
    }

    #[test]
    fn embedding_has_requested_dims() {
        let embedder = HashEmbedder::new(64);
        assert_eq!(embedder.embed("leadership experience").len(), 64);
    }

    #[test]
    fn embedding_is_normalized() {
        let embedder = HashEmbedder::new(256);
        let v = embedder.embed("describe a conflict with a coworker");
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-3);
    }

    #[test]
    fn empty_text_is_the_zero_vector() {
        let embedder = HashEmbedder::new(32);
        let v = embedder.embed("");
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn related_text_scores_higher_than_unrelated() {
        let embedder = HashEmbedder::new(256);
        let query = embedder.embed("tell me about working in a team");
        let related = embedder.embed("tell me about your team working style");
        let unrelated = embedder.embed("quantum chromodynamics lattice gauge theory");
        assert!(dot(&query, &related) > dot(&query, &unrelated));
    }

    #[test]
    fn tokenize_drops_single_chars_and_punctuation() {
        assert_eq!(tokenize("A b, cd-ef!"), vec!["cd", "ef"]);
    }

    #[test]
    fn zero_dims_is_harmless() {
        let embedder = HashEmbedder::new(0);
        assert!(embedder.embed("anything").is_empty());
    }
}

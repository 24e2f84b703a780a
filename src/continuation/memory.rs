use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;

use super::PlayedNote;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NoteRef {
    phrase: usize,
    position: usize,
}

#[derive(Debug)]
struct Node {
    pitch: u8,
    continuations: Vec<NoteRef>,
    children: Vec<Node>,
}

impl Node {
    fn new(pitch: u8) -> Self {
        Self {
            pitch,
            continuations: Vec::new(),
            children: Vec::new(),
        }
    }

    fn child(&self, pitch: u8) -> Option<&Node> {
        self.children.iter().find(|c| c.pitch == pitch)
    }

    fn child_or_insert(&mut self, pitch: u8) -> &mut Node {
        let index = match self.children.iter().position(|c| c.pitch == pitch) {
            Some(index) => index,
            None => {
                self.children.push(Node::new(pitch));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }
}

/// Prefix trees over every phrase heard so far.
///
/// For each note of a phrase after the first, the notes leading up to it are
/// walked backwards from the one right before it. The first of those picks
/// the tree, the rest pick a path down it, and the note is stored as a
/// possible continuation at every node on the way. Longer matching context
/// therefore narrows the choice.
#[derive(Debug, Default)]
pub struct Memory {
    roots: BTreeMap<u8, Node>,
    phrases: Vec<Vec<PlayedNote>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn train(&mut self, phrase: Vec<PlayedNote>) {
        if phrase.is_empty() {
            return;
        }
        let index = self.phrases.len();

        for k in (1..phrase.len()).rev() {
            let continuation = NoteRef {
                phrase: index,
                position: k,
            };
            let root_pitch = phrase[k - 1].pitch;
            let mut node = self
                .roots
                .entry(root_pitch)
                .or_insert_with(|| Node::new(root_pitch));
            node.continuations.push(continuation);

            for earlier in phrase[..k - 1].iter().rev() {
                node = node.child_or_insert(earlier.pitch);
                node.continuations.push(continuation);
            }
        }

        self.phrases.push(phrase);
    }

    /// Continues `seed` for up to `max_len` notes. Each step follows the
    /// longest stretch of recent context the trees know and picks one of the
    /// continuations stored there. Stops early once the last note was never
    /// followed by anything.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        seed: &[u8],
        max_len: usize,
        rng: &mut R,
    ) -> Vec<PlayedNote> {
        let mut context = seed.to_vec();
        let mut generated = Vec::new();

        while generated.len() < max_len {
            let Some(mut node) = context.last().and_then(|last| self.roots.get(last)) else {
                break;
            };
            for pitch in context.iter().rev().skip(1) {
                match node.child(*pitch) {
                    Some(child) => node = child,
                    None => break,
                }
            }
            let Some(next) = node.continuations.choose(rng) else {
                break;
            };

            let note = self.phrases[next.phrase][next.position];
            context.push(note.pitch);
            generated.push(note);
        }

        generated
    }

    pub fn phrases(&self) -> usize {
        self.phrases.len()
    }

    fn pitch_of(&self, note: NoteRef) -> u8 {
        self.phrases[note.phrase][note.position].pitch
    }

    fn write_node(
        &self,
        f: &mut fmt::Formatter<'_>,
        node: &Node,
        branch: &mut Vec<u8>,
    ) -> fmt::Result {
        branch.push(node.pitch);

        let path: Vec<String> = branch.iter().map(ToString::to_string).collect();
        let next: Vec<String> = node
            .continuations
            .iter()
            .map(|c| self.pitch_of(*c).to_string())
            .collect();
        writeln!(
            f,
            "{:indent$}{} [{}]",
            "",
            path.join(" <- "),
            next.join(", "),
            indent = (branch.len() - 1) * 4
        )?;

        for child in &node.children {
            self.write_node(f, child, branch)?;
        }

        branch.pop();
        Ok(())
    }
}

/// One line per node: the context path read backwards from the root, then
/// the pitches that followed it.
impl fmt::Display for Memory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut branch = Vec::new();
        for root in self.roots.values() {
            self.write_node(f, root, &mut branch)?;
        }
        Ok(())
    }
}

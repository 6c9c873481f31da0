//! Dictionary automaton for maximal-matching segmentation.
//!
//! The automaton is a character trie stored as an arena of rows addressed by
//! index, so that it can be written to disk as is and shared read-only between
//! any number of segmenters. For each character, a row may hold:
//!
//! - a command index: a dictionary entry ends on this character, and
//! - a next-row reference: the walk can go on after this character.
//!
//! Dictionaries are compiled from lines of the form `<surface form> <command>`,
//! split on the first space. The command is a lemmatization instruction (see
//! [`Command`]).

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lemma::Command;

/// Version of the compiled dictionary format
pub const FORMAT_VERSION: u32 = 1;

/// Reference to a row of the automaton
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowRef(u32);

impl RowRef {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Index of a command in the automaton's command table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandIndex(u32);

impl CommandIndex {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a row knows about one character
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cell {
    /// Set when a dictionary entry ends on this character
    pub cmd: Option<CommandIndex>,
    /// Set when longer entries continue after this character
    pub next: Option<RowRef>,
}

/// A row of the automaton
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    /// Cells sorted by character
    cells: Vec<(char, Cell)>,
}

static EMPTY_ROW: Row = Row { cells: Vec::new() };
static KEEP: Command = Command::Keep;

impl Row {
    fn cell(&self, c: char) -> Option<&Cell> {
        self.cells
            .binary_search_by_key(&c, |(k, _)| *k)
            .ok()
            .map(|i| &self.cells[i].1)
    }

    fn cell_mut(&mut self, c: char) -> &mut Cell {
        let i = match self.cells.binary_search_by_key(&c, |(k, _)| *k) {
            Ok(i) => i,
            Err(i) => {
                self.cells.insert(i, (c, Cell::default()));
                i
            }
        };
        &mut self.cells[i].1
    }

    /// Command of the entry ending on `c`, if any
    pub fn command(&self, c: char) -> Option<CommandIndex> {
        self.cell(c).and_then(|cell| cell.cmd)
    }

    /// Row to continue with after `c`, if any
    pub fn next(&self, c: char) -> Option<RowRef> {
        self.cell(c).and_then(|cell| cell.next)
    }

    /// Number of characters this row knows
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row knows no character
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Serialized form of the automaton
#[derive(Deserialize)]
struct TrieData {
    version: u32,
    root: RowRef,
    entries: usize,
    rows: Vec<Row>,
    commands: Vec<String>,
}

/// Borrowed twin of [`TrieData`], field for field
#[derive(Serialize)]
struct TrieDataRef<'a> {
    version: u32,
    root: RowRef,
    entries: usize,
    rows: &'a [Row],
    commands: &'a [String],
}

/// The compiled dictionary automaton.
///
/// Immutable once built: walking it never needs `&mut`, so it can be shared
/// behind an `Arc` by concurrent segmenters.
#[derive(Debug, Clone)]
pub struct Trie {
    root: RowRef,
    rows: Vec<Row>,
    /// Raw command strings, as compiled
    raw_commands: Vec<String>,
    /// The same commands, decoded
    commands: Vec<Command>,
    /// Number of entries
    entries: usize,
}

impl Default for Trie {
    fn default() -> Self {
        Trie::from_parts(RowRef(0), vec![Row::default()], Vec::new(), 0)
    }
}

impl Trie {
    /// Create a new empty Trie
    pub fn new() -> Self {
        Trie::default()
    }

    fn from_parts(root: RowRef, rows: Vec<Row>, raw_commands: Vec<String>, entries: usize) -> Self {
        let commands = raw_commands.iter().map(|raw| Command::parse(raw)).collect();
        Trie {
            root,
            rows,
            raw_commands,
            commands,
            entries,
        }
    }

    /// Get the number of entries in the trie
    pub fn len(&self) -> usize {
        self.entries
    }

    /// Check if the trie is empty
    pub fn is_empty(&self) -> bool {
        self.entries == 0
    }

    /// Number of rows in the arena
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Reference to the root row
    pub fn root(&self) -> RowRef {
        self.root
    }

    /// Get a row. References from another automaton resolve to an empty row.
    pub fn row(&self, r: RowRef) -> &Row {
        self.rows.get(r.index()).unwrap_or(&EMPTY_ROW)
    }

    /// Raw command string, as found in the dictionary source
    pub fn command_value(&self, idx: CommandIndex) -> &str {
        self.raw_commands.get(idx.index()).map_or("", String::as_str)
    }

    /// Decoded command
    pub fn command(&self, idx: CommandIndex) -> &Command {
        self.commands.get(idx.index()).unwrap_or(&KEEP)
    }

    /// Walk the whole text and return the command of the entry it spells, if any
    pub fn lookup(&self, text: &str) -> Option<CommandIndex> {
        let mut row = Some(self.root);
        let mut cmd = None;
        for c in text.chars() {
            let current = self.row(row?);
            cmd = current.command(c);
            row = current.next(c);
        }
        cmd
    }

    /// Check if a text is exactly a dictionary entry
    pub fn contains(&self, text: &str) -> bool {
        self.lookup(text).is_some()
    }

    /// Encode the automaton in the compiled dictionary format
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let data = TrieDataRef {
            version: FORMAT_VERSION,
            root: self.root,
            entries: self.entries,
            rows: &self.rows,
            commands: &self.raw_commands,
        };
        Ok(bincode::serialize(&data)?)
    }

    /// Decode a compiled dictionary
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let data: TrieData = bincode::deserialize(bytes)?;
        if data.version != FORMAT_VERSION {
            return Err(Error::IncompatibleArtifact {
                found: data.version,
                expected: FORMAT_VERSION,
            });
        }
        validate(&data)?;

        let trie = Trie::from_parts(data.root, data.rows, data.commands, data.entries);
        log::debug!(
            "loaded compiled dictionary: {} entries, {} rows, {} commands",
            trie.entries,
            trie.rows.len(),
            trie.commands.len()
        );
        Ok(trie)
    }

    /// Write the compiled dictionary to a file
    pub fn store(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_bytes()?)?;
        Ok(())
    }

    /// Read a compiled dictionary from a file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = fs::read(path)?;
        Trie::from_bytes(&bytes)
    }
}

/// Check that every reference of a decoded artifact stays inside its tables
fn validate(data: &TrieData) -> Result<()> {
    let corrupt = |msg: String| Error::Artifact(Box::new(bincode::ErrorKind::Custom(msg)));

    if data.root.index() >= data.rows.len() {
        return Err(corrupt(format!("root row {} out of range", data.root.0)));
    }
    for (i, row) in data.rows.iter().enumerate() {
        for (c, cell) in &row.cells {
            if cell.next.is_some_and(|next| next.index() >= data.rows.len()) {
                return Err(corrupt(format!("row {i}: transition on {c:?} points outside the arena")));
            }
            if cell.cmd.is_some_and(|cmd| cmd.index() >= data.commands.len()) {
                return Err(corrupt(format!("row {i}: command on {c:?} out of range")));
            }
        }
    }
    Ok(())
}

/// Builder compiling dictionary lines into a Trie
pub struct TrieBuilder {
    rows: Vec<Row>,
    commands: Vec<String>,
    command_ids: HashMap<String, CommandIndex>,
    entries: usize,
}

impl TrieBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        TrieBuilder {
            rows: vec![Row::default()],
            commands: Vec::new(),
            command_ids: HashMap::new(),
            entries: 0,
        }
    }

    fn intern(&mut self, command: &str) -> CommandIndex {
        if let Some(&idx) = self.command_ids.get(command) {
            return idx;
        }
        let idx = CommandIndex(self.commands.len() as u32);
        self.commands.push(command.to_string());
        self.command_ids.insert(command.to_string(), idx);
        idx
    }

    /// Add one entry. An empty surface form is ignored.
    ///
    /// When the same surface form is added twice, the last command wins.
    pub fn add(&mut self, surface: &str, command: &str) {
        let chars: Vec<char> = surface.chars().collect();
        let Some((&last, init)) = chars.split_last() else {
            return;
        };

        let mut row = 0;
        for &c in init {
            row = match self.rows[row].next(c) {
                Some(next) => next.index(),
                None => {
                    let next = self.rows.len();
                    self.rows.push(Row::default());
                    self.rows[row].cell_mut(c).next = Some(RowRef(next as u32));
                    next
                }
            };
        }

        let cmd = self.intern(command);
        let cell = self.rows[row].cell_mut(last);
        match cell.cmd {
            None => self.entries += 1,
            Some(previous) if previous != cmd => {
                log::warn!(
                    "duplicate dictionary entry {}: command {:?} replaced by {:?}",
                    surface,
                    self.commands[previous.index()],
                    command
                );
            }
            Some(_) => {}
        }
        cell.cmd = Some(cmd);
    }

    fn add_line(&mut self, line_number: usize, line: &str) -> Result<()> {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            return Ok(());
        }
        match line.split_once(' ') {
            Some((surface, command)) if !surface.is_empty() => {
                self.add(surface, command);
                Ok(())
            }
            _ => Err(Error::MalformedLine {
                line_number,
                line: line.to_string(),
            }),
        }
    }

    /// Add entries from dictionary text, one `<surface> <command>` per line.
    ///
    /// Empty lines are skipped; a line without a space aborts the build.
    pub fn add_lines(&mut self, text: &str) -> Result<()> {
        for (i, line) in text.lines().enumerate() {
            self.add_line(i + 1, line)?;
        }
        Ok(())
    }

    /// Add entries from a reader, with the same format as [`TrieBuilder::add_lines`]
    pub fn add_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for (i, line) in reader.lines().enumerate() {
            self.add_line(i + 1, &line?)?;
        }
        Ok(())
    }

    /// Add entries from a dictionary file
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        log::debug!("reading dictionary source {}", path.display());
        self.add_reader(BufReader::new(File::open(path)?))
    }

    /// Build and return the Trie
    pub fn build(self) -> Trie {
        log::debug!(
            "compiled dictionary: {} entries, {} rows, {} commands",
            self.entries,
            self.rows.len(),
            self.commands.len()
        );
        Trie::from_parts(RowRef(0), self.rows, self.commands, self.entries)
    }
}

impl Default for TrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

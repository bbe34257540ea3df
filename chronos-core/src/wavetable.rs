use thiserror::Error;

/// An analog drive pattern for the sensor readout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WavetableDescriptor {
    /// Length of the pattern in sensor clocks.
    pub clocks: u32,
    /// Pattern used for normal readout.
    pub normal_table: Vec<u8>,
    /// Pattern used during gain calibration. It drives the dummy voltage onto the column amplifiers.
    pub gain_cal_table: Vec<u8>,
    /// Delay from the start of a row to the anti-blooming edge, in timing clocks.
    pub abn_delay: u32,
}

impl WavetableDescriptor {
    /// Returns the table for the given mode.
    #[must_use]
    pub fn table(&self, gain_cal: bool) -> &[u8] {
        if gain_cal {
            &self.gain_cal_table
        } else {
            &self.normal_table
        }
    }
}

/// An error produced when building a [`Wavetables`] catalog.
#[derive(Error, Debug, PartialEq, Eq, Clone, Copy)]
pub enum WavetableError {
    /// The catalog has no entries.
    #[error("Wavetable catalog is empty")]
    Empty,
    /// The catalog is not strictly ordered from longest to shortest.
    #[error("Wavetable catalog must be sorted by descending length (entry {index})")]
    NotDescending {
        /// Index of the first out-of-order entry.
        index: usize,
    },
}

/// A catalog of [`WavetableDescriptor`]s, longest first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wavetables {
    tables: Vec<WavetableDescriptor>,
}

impl Wavetables {
    /// Creates a new catalog.
    pub fn new(tables: Vec<WavetableDescriptor>) -> Result<Self, WavetableError> {
        if tables.is_empty() {
            return Err(WavetableError::Empty);
        }
        if let Some(index) = tables
            .windows(2)
            .position(|w| w[0].clocks <= w[1].clocks)
        {
            return Err(WavetableError::NotDescending { index: index + 1 });
        }
        Ok(Self { tables })
    }

    /// Iterates from the longest to the shortest table.
    pub fn iter(&self) -> impl Iterator<Item = &WavetableDescriptor> {
        self.tables.iter()
    }

    /// The longest table.
    #[must_use]
    pub fn longest(&self) -> &WavetableDescriptor {
        &self.tables[0]
    }

    /// The shortest table.
    #[must_use]
    pub fn shortest(&self) -> &WavetableDescriptor {
        &self.tables[self.tables.len() - 1]
    }

    /// Finds a table by length.
    #[must_use]
    pub fn find(&self, clocks: u32) -> Option<&WavetableDescriptor> {
        self.tables.iter().find(|wt| wt.clocks == clocks)
    }

    /// Number of tables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Always `false`; a catalog has at least one table.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Stdin, Stdout, Write};
use std::path::PathBuf;

/// The conventional path meaning "use the standard stream instead".
pub const STDIO_PATH: &str = "-";

/// A created file that will be deleted when the handle is dropped, unless you
/// call `self.set_persist(true)`.
pub struct TransientFile {
    file: File,
    path: PathBuf,
    persist: bool,
}

impl TransientFile {
    pub fn create<P: Into<PathBuf>>(path: P) -> io::Result<Self> {
        let path = path.into();
        let file = File::create(&path)?;
        Ok(Self {
            file,
            path,
            persist: false,
        })
    }

    pub fn set_persist(&mut self, persist: bool) {
        self.persist = persist;
    }
}

impl Drop for TransientFile {
    fn drop(&mut self) {
        // If the file was not persisted, delete it.
        if !self.persist {
            // We can't report an error or panic here, so just ignore the result.
            let _ = fs::remove_file(&self.path);
        }
    }
}

impl Write for TransientFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// Possible inputs: a named file or stdin.
pub enum Input {
    File(BufReader<File>),
    Stdin(BufReader<Stdin>),
}

impl Input {
    /// Open `path` for reading, or stdin if it is `STDIO_PATH`.
    pub fn open(path: &str) -> io::Result<Self> {
        if path == STDIO_PATH {
            Ok(Input::Stdin(BufReader::new(io::stdin())))
        } else {
            File::open(path).map(|f| Input::File(BufReader::new(f)))
        }
    }
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::File(f) => f.read(buf),
            Input::Stdin(s) => s.read(buf),
        }
    }
}

impl BufRead for Input {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Input::File(f) => f.fill_buf(),
            Input::Stdin(s) => s.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Input::File(f) => f.consume(amt),
            Input::Stdin(s) => s.consume(amt),
        }
    }
}

/// Possible outputs: a transient file that only survives a successful run,
/// or stdout.
pub enum Output {
    File(TransientFile),
    Stdout(Stdout),
}

impl Output {
    /// Create `path` for writing, or use stdout if it is `STDIO_PATH`.
    pub fn create(path: &str) -> io::Result<Self> {
        if path == STDIO_PATH {
            Ok(Output::Stdout(io::stdout()))
        } else {
            TransientFile::create(path).map(Output::File)
        }
    }

    /// Flush everything and keep the file on disk.
    pub fn commit(&mut self) -> io::Result<()> {
        self.flush()?;
        if let Output::File(f) = self {
            f.set_persist(true);
        }
        Ok(())
    }
}

impl Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::File(f) => f.write(buf),
            Output::Stdout(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::File(f) => f.flush(),
            Output::Stdout(s) => s.flush(),
        }
    }
}

pub mod checker;
pub mod parser;
pub mod report;

pub use checker::probe::{HttpProbe, HttpsProber};
pub use checker::rpmlint::RPMLINT_CHECK_ID;
pub use checker::target::OsInfo;
pub use checker::{check, check_with_os, CheckOptions, Registry};
pub use parser::{read, Header, Line, Section, SpecError, SpecFile};
pub use report::{Alert, Report, Severity};

pub mod availability;
pub mod blocks;
pub mod booking;
pub mod code;
pub mod conflict;
pub mod directory;
pub mod lattice;
pub mod lifecycle;
pub mod reports;

pub use availability::AvailabilityResolver;
pub use blocks::BlockManager;
pub use booking::BookingService;
pub use conflict::{ConflictDetector, SlotCandidate};
pub use directory::DirectoryService;
pub use lattice::SlotLattice;
pub use lifecycle::AppointmentLifecycleService;
pub use reports::ReportService;

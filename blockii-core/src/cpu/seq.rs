/// Unprogrammed sequences: sub-instructions the CPU slips in between
/// program instructions, here the PINC counter bumps driven by the
/// cycle timers. Pending sequences live on a LIFO stack so a chained
/// child (TIME1 carrying into TIME2) runs before anything queued
/// earlier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnprogSeq {
    PincTime1,
    PincTime2,
    PincTime3,
    PincTime4,
    PincTime5,
}

impl UnprogSeq {
    pub fn name(self) -> &'static str {
        match self {
            UnprogSeq::PincTime1 => "PINC TIME1",
            UnprogSeq::PincTime2 => "PINC TIME2",
            UnprogSeq::PincTime3 => "PINC TIME3",
            UnprogSeq::PincTime4 => "PINC TIME4",
            UnprogSeq::PincTime5 => "PINC TIME5",
        }
    }

    /// Every PINC costs one MCT.
    pub fn timing(self) -> u32 {
        1
    }
}

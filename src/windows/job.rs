//! Job object used as a lifetime fence for the child process

use std::ffi::c_void;
use std::mem::size_of;

use windows::core::PCWSTR;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::System::JobObjects::{
    AssignProcessToJobObject, CreateJobObjectW, JobObjectExtendedLimitInformation,
    QueryInformationJobObject, SetInformationJobObject, JOBOBJECT_EXTENDED_LIMIT_INFORMATION,
    JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE, JOB_OBJECT_LIMIT_SILENT_BREAKAWAY_OK,
};

use crate::core::error::{hresult_from_win32, LaunchError};

/// Win32 `ERROR_BAD_LENGTH`
const ERROR_BAD_LENGTH: u32 = 24;

/// RAII wrapper for a job object handle.
///
/// Closing the handle kills every process still in the job, so drop it only
/// after the child's exit code has been read.
pub struct JobObject {
    handle: HANDLE,
}

impl JobObject {
    /// Create an anonymous job that kills its processes when closed and lets
    /// grandchildren break away silently.
    pub fn kill_on_close() -> Result<Self, LaunchError> {
        unsafe {
            let handle = CreateJobObjectW(None, PCWSTR::null())
                .map_err(|e| LaunchError::from_win("CreateJobObjectW", e))?;
            let job = Self { handle };

            let mut info = JOBOBJECT_EXTENDED_LIMIT_INFORMATION::default();
            let mut info_len = 0u32;
            QueryInformationJobObject(
                job.handle,
                JobObjectExtendedLimitInformation,
                &mut info as *mut _ as *mut c_void,
                size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
                Some(&mut info_len),
            )
            .map_err(|e| LaunchError::from_win("QueryInformationJobObject", e))?;
            if info_len as usize != size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() {
                return Err(LaunchError::Os {
                    context: "QueryInformationJobObject",
                    code: hresult_from_win32(ERROR_BAD_LENGTH),
                });
            }

            info.BasicLimitInformation.LimitFlags = info.BasicLimitInformation.LimitFlags
                | JOB_OBJECT_LIMIT_KILL_ON_JOB_CLOSE
                | JOB_OBJECT_LIMIT_SILENT_BREAKAWAY_OK;
            SetInformationJobObject(
                job.handle,
                JobObjectExtendedLimitInformation,
                &info as *const _ as *const c_void,
                size_of::<JOBOBJECT_EXTENDED_LIMIT_INFORMATION>() as u32,
            )
            .map_err(|e| LaunchError::from_win("SetInformationJobObject", e))?;

            Ok(job)
        }
    }

    /// Put `process` into the job.
    pub fn assign(&self, process: HANDLE) -> Result<(), LaunchError> {
        unsafe {
            AssignProcessToJobObject(self.handle, process)
                .map_err(|e| LaunchError::from_win("AssignProcessToJobObject", e))
        }
    }
}

impl Drop for JobObject {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

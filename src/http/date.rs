use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

/// Last second `253402300799` is `Fri, 31 Dec 9999 23:59:59 GMT`.
const MAX_SECS: u64 = 253_402_300_799;

const DAY_NAMES: [&[u8; 3]; 7] = [b"Thu", b"Fri", b"Sat", b"Sun", b"Mon", b"Tue", b"Wed"];
const MONTH_NAMES: [&[u8; 3]; 12] = [
    b"Jan", b"Feb", b"Mar", b"Apr", b"May", b"Jun", b"Jul", b"Aug", b"Sep", b"Oct", b"Nov", b"Dec",
];

thread_local! {
    static CACHED: Cell<(u64, [u8; 29])> = const { Cell::new((u64::MAX, [0; 29])) };
}

/// Create [httpdate][rfc] for current time.
///
/// The formatted value is cached per thread for the current second.
///
/// [rfc]: <https://datatracker.ietf.org/doc/html/rfc9110#section-5.6.7>
pub fn httpdate_now() -> [u8; 29] {
    let secs = unix_secs(SystemTime::now());
    CACHED.with(|cached| {
        let (at, date) = cached.get();
        if at == secs {
            return date;
        }
        let date = format_secs(secs);
        cached.set((secs, date));
        date
    })
}

/// Create [httpdate][rfc] with given time.
///
/// Times before the epoch format as the epoch, times past year 9999 saturate.
///
/// [rfc]: <https://datatracker.ietf.org/doc/html/rfc9110#section-5.6.7>
pub fn httpdate(time: SystemTime) -> [u8; 29] {
    format_secs(unix_secs(time))
}

fn unix_secs(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .map_or(0, |dur| dur.as_secs())
        .min(MAX_SECS)
}

fn format_secs(secs: u64) -> [u8; 29] {
    let days = secs / 86_400;
    let secs_of_day = secs % 86_400;
    let (year, month, day) = civil_from_days(days);

    let mut buf: [u8; 29] = *b"ddd, 00 mmm 0000 00:00:00 GMT";
    buf[..3].copy_from_slice(DAY_NAMES[(days % 7) as usize]);
    put_2digits(&mut buf[5..7], day);
    buf[8..11].copy_from_slice(MONTH_NAMES[(month - 1) as usize]);
    put_2digits(&mut buf[12..14], year / 100);
    put_2digits(&mut buf[14..16], year % 100);
    put_2digits(&mut buf[17..19], secs_of_day / 3600);
    put_2digits(&mut buf[20..22], secs_of_day % 3600 / 60);
    put_2digits(&mut buf[23..25], secs_of_day % 60);
    buf
}

fn put_2digits(dst: &mut [u8], value: u64) {
    dst[0] = b'0' + (value / 10 % 10) as u8;
    dst[1] = b'0' + (value % 10) as u8;
}

/// Convert days since the epoch into `(year, month, day)`.
///
/// Counts eras of 400 years starting at `0000-03-01`, so the leap day is the last
/// day of each computed year.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    // days from 0000-03-01 to 1970-01-01
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};
    use super::{httpdate, httpdate_now};

    #[test]
    fn test_httpdate() {
        let d = UNIX_EPOCH;
        assert_eq!(str::from_utf8(&httpdate(d)), Ok("Thu, 01 Jan 1970 00:00:00 GMT"));
        let d = UNIX_EPOCH + Duration::from_secs(1475419451);
        assert_eq!(str::from_utf8(&httpdate(d)), Ok("Sun, 02 Oct 2016 14:44:11 GMT"));
        let d = UNIX_EPOCH + Duration::from_secs(951782400);
        assert_eq!(str::from_utf8(&httpdate(d)), Ok("Tue, 29 Feb 2000 00:00:00 GMT"));
        let d = UNIX_EPOCH + Duration::from_secs(u64::MAX / 2);
        assert_eq!(str::from_utf8(&httpdate(d)), Ok("Fri, 31 Dec 9999 23:59:59 GMT"));
    }

    #[test]
    fn test_httpdate_now() {
        let date = httpdate_now();
        assert!(date.ends_with(b" GMT"));
        assert_eq!(date[3], b',');
    }
}

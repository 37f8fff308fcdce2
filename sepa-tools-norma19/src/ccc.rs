const WEIGHTS: [u32; 10] = [1, 2, 4, 8, 5, 10, 9, 7, 3, 6];

/// Checks the two control digits of a 20 digit Spanish account code
/// (bank, branch, control, account number).
pub fn is_ccc_valid(ccc: &str) -> bool {
    if ccc.len() != 20 || !ccc.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let first = control_digit(&format!("00{}", &ccc[..8]));
    let second = control_digit(&ccc[10..]);
    matches!((first, second), (Some(a), Some(b)) if ccc[8..10] == format!("{}{}", a, b))
}

fn control_digit(digits: &str) -> Option<u32> {
    let mut sum = 0;
    for (c, weight) in digits.chars().zip(WEIGHTS) {
        sum += c.to_digit(10)? * weight;
    }
    Some(match 11 - sum % 11 {
        11 => 0,
        10 => 1,
        digit => digit,
    })
}

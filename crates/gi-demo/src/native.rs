//! Native side of the `Demo` namespace
//!
//! Plain `extern "C"` functions standing in for a C library. Counter
//! instances start with a class pointer, laid out like a `GTypeInstance`, so
//! the runtime can read their `GType`.

use std::ffi::{c_void, CStr};

use gi::{CStrArray, GError, GType, SymbolTable};
use libc::c_char;
use parking_lot::Mutex;

pub const COUNTER_TYPE: GType = GType(0x1000);
pub const LABELED_COUNTER_TYPE: GType = GType(0x1010);

/// Error domain of `demo_parse_int`
pub const PARSE_ERROR_DOMAIN: u32 = 17;

#[repr(C)]
struct Class {
    g_type: GType,
}

static COUNTER_CLASS: Class = Class { g_type: COUNTER_TYPE };
static LABELED_COUNTER_CLASS: Class = Class {
    g_type: LABELED_COUNTER_TYPE,
};

#[repr(C)]
struct Counter {
    class: *const Class,
    value: i32,
    label: *mut c_char,
}

type ApplyFn = extern "C" fn(i32, *mut c_void) -> i32;
type VisitFn = extern "C" fn(i32) -> i32;
type NotifyFn = extern "C" fn(*mut c_void);

/// A stored callback and its user data address
type Pending = Option<(ApplyFn, usize)>;

static DEFERRED: Mutex<Pending> = Mutex::new(None);
static WATCHED: Mutex<Pending> = Mutex::new(None);

unsafe fn text_of(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    CStr::from_ptr(p).to_string_lossy().into_owned()
}

extern "C" fn demo_add(a: i32, b: i32) -> i32 {
    a + b
}

extern "C" fn demo_shout(s: *const c_char) -> *mut c_char {
    let loud = unsafe { text_of(s) }.to_uppercase();
    gi::c_string(&loud)
}

static GREETING: &[u8] = b"hello from demo\0";

extern "C" fn demo_greeting() -> *const c_char {
    GREETING.as_ptr() as *const c_char
}

extern "C" fn demo_parse_int(s: *const c_char, out: *mut i32, error: *mut *mut GError) -> i32 {
    let input = unsafe { text_of(s) };
    match input.trim().parse::<i32>() {
        Ok(v) => {
            unsafe { *out = v };
            gi::TRUE
        }
        Err(e) => {
            if !error.is_null() {
                unsafe {
                    let err = gi::malloc(std::mem::size_of::<GError>()) as *mut GError;
                    err.write(GError {
                        domain: PARSE_ERROR_DOMAIN,
                        code: 1,
                        message: gi::c_string(&format!("{:?}: {}", input, e)),
                    });
                    *error = err;
                }
            }
            gi::FALSE
        }
    }
}

extern "C" fn demo_apply_twice(func: ApplyFn, user_data: *mut c_void, x: i32) -> i32 {
    func(func(x, user_data), user_data)
}

extern "C" fn demo_defer(func: ApplyFn, user_data: *mut c_void) {
    *DEFERRED.lock() = Some((func, user_data as usize));
}

/// Invoke the deferred callback; -1 when nothing was deferred
extern "C" fn demo_run_deferred(x: i32) -> i32 {
    let pending = *DEFERRED.lock();
    match pending {
        Some((func, data)) => func(x, data as *mut c_void),
        None => -1,
    }
}

/// Call `func` once, then release it through `notify` right away
extern "C" fn demo_watch(func: ApplyFn, data: *mut c_void, notify: NotifyFn, x: i32) -> i32 {
    *WATCHED.lock() = Some((func, data as usize));
    let result = func(x, data);
    notify(data);
    result
}

extern "C" fn demo_poke_watched(x: i32) -> i32 {
    let pending = *WATCHED.lock();
    match pending {
        Some((func, data)) => func(x, data as *mut c_void),
        None => -1,
    }
}

/// Visit `0..n` until the visitor returns false; returns the number of visits
extern "C" fn demo_visit_range(n: i32, visitor: VisitFn) -> i32 {
    let mut visits = 0;
    for i in 0..n {
        visits += 1;
        if visitor(i) == gi::FALSE {
            break;
        }
    }
    visits
}

extern "C" fn demo_sum(values: *const i32, n_values: i32) -> i32 {
    if values.is_null() || n_values <= 0 {
        return 0;
    }
    unsafe { std::slice::from_raw_parts(values, n_values as usize) }
        .iter()
        .sum()
}

extern "C" fn demo_split_words(s: *const c_char, n_words: *mut i32) -> *mut *mut c_char {
    let input = unsafe { text_of(s) };
    let words: Vec<&str> = input.split_whitespace().collect();
    unsafe { *n_words = words.len() as i32 };
    CStrArray::from_strings_zt(&words).p
}

extern "C" fn demo_bump(value: *mut i32) {
    unsafe { *value += 1 };
}

extern "C" fn demo_counter_get_type() -> GType {
    COUNTER_TYPE
}

extern "C" fn demo_labeled_counter_get_type() -> GType {
    LABELED_COUNTER_TYPE
}

fn new_counter(label: Option<&str>) -> *mut c_void {
    let (class, label) = match label {
        Some(label) => (&LABELED_COUNTER_CLASS as *const Class, gi::c_string(label)),
        None => (&COUNTER_CLASS as *const Class, std::ptr::null_mut()),
    };
    Box::into_raw(Box::new(Counter {
        class,
        value: 0,
        label,
    })) as *mut c_void
}

extern "C" fn demo_counter_new() -> *mut c_void {
    new_counter(None)
}

extern "C" fn demo_counter_increment(counter: *mut c_void, by: i32) {
    let counter = counter as *mut Counter;
    unsafe { (*counter).value += by };
}

extern "C" fn demo_counter_get(counter: *mut c_void) -> i32 {
    unsafe { (*(counter as *mut Counter)).value }
}

extern "C" fn demo_counter_free(counter: *mut c_void) {
    if counter.is_null() {
        return;
    }
    let counter = unsafe { Box::from_raw(counter as *mut Counter) };
    unsafe { gi::free(counter.label) };
}

extern "C" fn demo_labeled_counter_new(label: *const c_char) -> *mut c_void {
    new_counter(Some(&unsafe { text_of(label) }))
}

extern "C" fn demo_labeled_counter_label(counter: *mut c_void) -> *const c_char {
    unsafe { (*(counter as *mut Counter)).label }
}

extern "C" fn demo_make_counter(labeled: i32) -> *mut c_void {
    if labeled != gi::FALSE {
        new_counter(Some("made"))
    } else {
        new_counter(None)
    }
}

extern "C" fn demo_mood_of(level: i32) -> i32 {
    match level {
        i32::MIN..=0 => 0,
        1..=4 => 1,
        _ => 2,
    }
}

extern "C" fn demo_can_write(access: u32) -> i32 {
    gi::bool_to_int(access & 2 != 0)
}

/// Upper-case `*text` in place, taking ownership of the old string
extern "C" fn demo_shout_in_place(text: *mut *mut c_char) {
    unsafe {
        let old = *text;
        let loud = text_of(old).to_uppercase();
        gi::free(old);
        *text = gi::c_string(&loud);
    }
}

/// Free `*counter` and replace it with a counter 100 ahead
extern "C" fn demo_replace_counter(counter: *mut *mut c_void) {
    unsafe {
        let old = *counter;
        let value = if old.is_null() { 0 } else { demo_counter_get(old) };
        demo_counter_free(old);
        let fresh = demo_counter_new();
        demo_counter_increment(fresh, value + 100);
        *counter = fresh;
    }
}

/// -1 when no callback is passed
extern "C" fn demo_apply_unpaired(func: Option<ApplyFn>, user_data: *mut c_void) -> i32 {
    match func {
        Some(func) => func(0, user_data),
        None => -1,
    }
}

/// Symbol table of every native function of the namespace
pub fn symbols() -> SymbolTable {
    SymbolTable::new()
        .with("demo_add", demo_add as *const c_void)
        .with("demo_shout", demo_shout as *const c_void)
        .with("demo_greeting", demo_greeting as *const c_void)
        .with("demo_parse_int", demo_parse_int as *const c_void)
        .with("demo_apply_twice", demo_apply_twice as *const c_void)
        .with("demo_defer", demo_defer as *const c_void)
        .with("demo_run_deferred", demo_run_deferred as *const c_void)
        .with("demo_watch", demo_watch as *const c_void)
        .with("demo_poke_watched", demo_poke_watched as *const c_void)
        .with("demo_visit_range", demo_visit_range as *const c_void)
        .with("demo_sum", demo_sum as *const c_void)
        .with("demo_split_words", demo_split_words as *const c_void)
        .with("demo_bump", demo_bump as *const c_void)
        .with("demo_counter_get_type", demo_counter_get_type as *const c_void)
        .with("demo_labeled_counter_get_type", demo_labeled_counter_get_type as *const c_void)
        .with("demo_counter_new", demo_counter_new as *const c_void)
        .with("demo_counter_increment", demo_counter_increment as *const c_void)
        .with("demo_counter_get", demo_counter_get as *const c_void)
        .with("demo_counter_free", demo_counter_free as *const c_void)
        .with("demo_labeled_counter_new", demo_labeled_counter_new as *const c_void)
        .with("demo_labeled_counter_label", demo_labeled_counter_label as *const c_void)
        .with("demo_make_counter", demo_make_counter as *const c_void)
        .with("demo_mood_of", demo_mood_of as *const c_void)
        .with("demo_can_write", demo_can_write as *const c_void)
        .with("demo_shout_in_place", demo_shout_in_place as *const c_void)
        .with("demo_replace_counter", demo_replace_counter as *const c_void)
        .with("demo_apply_unpaired", demo_apply_unpaired as *const c_void)
}

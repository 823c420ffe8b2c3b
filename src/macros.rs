/// Macro to implement `From<T>` in both directions for newtype wrappers around primitive types.
#[macro_export]
macro_rules! impl_from_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl From<$primitive> for $wrapper {
            fn from(value: $primitive) -> Self {
                Self(value)
            }
        }

        impl From<$wrapper> for $primitive {
            fn from(wrapper: $wrapper) -> Self {
                wrapper.0
            }
        }
    };
}

/// Macro to implement `Add`, `Sub`, their assigning forms and `Sum` for newtype wrappers
/// around numeric types, including support for adding a primitive type directly.
#[macro_export]
macro_rules! impl_add_sub_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl std::ops::Add for $wrapper {
            type Output = Self;

            fn add(self, other: Self) -> Self {
                Self(self.0 + other.0)
            }
        }

        impl std::ops::Add<$primitive> for $wrapper {
            type Output = Self;

            fn add(self, rhs: $primitive) -> Self::Output {
                Self(self.0 + rhs)
            }
        }

        impl std::ops::AddAssign for $wrapper {
            fn add_assign(&mut self, rhs: Self) {
                self.0 += rhs.0;
            }
        }

        impl std::ops::Sub for $wrapper {
            type Output = Self;

            fn sub(self, other: Self) -> Self {
                Self(self.0 - other.0)
            }
        }

        impl std::ops::SubAssign for $wrapper {
            fn sub_assign(&mut self, rhs: Self) {
                self.0 -= rhs.0;
            }
        }

        impl std::iter::Sum for $wrapper {
            fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
                iter.fold(Self(0 as $primitive), |acc, x| Self(acc.0 + x.0))
            }
        }
    };
}

/// Macro to implement scaling by a dimensionless factor (`wrapper * factor`).
#[macro_export]
macro_rules! impl_scale_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl std::ops::Mul<$primitive> for $wrapper {
            type Output = Self;

            fn mul(self, factor: $primitive) -> Self::Output {
                Self(self.0 * factor)
            }
        }
    };
}

/// Macro to implement an `abs` method for newtype wrappers around numeric types.
#[macro_export]
macro_rules! impl_abs_primitive {
    ($wrapper:ident, $primitive:ty) => {
        impl $wrapper {
            /// Returns the absolute value of the wrapped primitive.
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }
    };
}
